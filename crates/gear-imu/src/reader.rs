use anyhow::{Context, Result};
use gear_proto::heading::Heading;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::decode::decode;
use crate::framing::FrameSync;
use crate::state::ImuStatus;
use crate::unwrap::YawUnwrapper;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub accepted: u64,
    pub rejected: u64,
}

/// Framing, decoding and unwrapping chained together. Every decoded sample
/// goes through the unwrapper exactly once.
#[derive(Debug)]
pub struct ImuPipeline {
    sync: FrameSync,
    unwrap: YawUnwrapper,
    stats: PipelineStats,
}

impl ImuPipeline {
    pub fn new(max_buffer_bytes: usize, max_rate_dps: f64) -> Self {
        Self {
            sync: FrameSync::new(max_buffer_bytes),
            unwrap: YawUnwrapper::new(max_rate_dps),
            stats: PipelineStats::default(),
        }
    }

    /// Returns the heading after the last good record in `raw`, if any.
    pub fn feed(&mut self, raw: &[u8]) -> Option<Heading> {
        let mut latest = None;
        for line in self.sync.submit(raw) {
            match decode(&line) {
                Ok(sample) => {
                    self.stats.accepted += 1;
                    let out = self.unwrap.accept(&sample);
                    latest = Some(Heading {
                        yaw_deg: out.yaw_deg,
                        rate_dps: out.rate_dps,
                        imu_time_us: sample.timestamp_us,
                        fusion_ok: sample.fusion_ok,
                    });
                }
                Err(e) => {
                    self.stats.rejected += 1;
                    debug!("imu: dropped line ({}): {:?}", e, line);
                }
            }
        }
        latest
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn frame_sync(&self) -> &FrameSync {
        &self.sync
    }
}

/// Read side of the published heading. Cheap to clone; every clone sees the
/// latest value.
#[derive(Debug, Clone)]
pub struct HeadingWatch {
    rx: watch::Receiver<Heading>,
}

impl HeadingWatch {
    pub fn latest(&self) -> Heading {
        *self.rx.borrow()
    }

    pub fn yaw_deg(&self) -> f64 {
        self.rx.borrow().yaw_deg
    }

    /// Waits for the next published heading.
    pub async fn changed(&mut self) -> Result<Heading> {
        self.rx.changed().await.context("imu reader stopped")?;
        Ok(*self.rx.borrow_and_update())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    pub poll_interval: Duration,
    pub max_buffer_bytes: usize,
    pub max_rate_dps: f64,
}

pub fn open_serial(dev: &str, baud: u32) -> Result<SerialStream> {
    tokio_serial::new(dev, baud)
        .open_native_async()
        .with_context(|| format!("open imu serial {}", dev))
}

/// Starts the background reader. It owns the stream and all unwrap state and
/// exits once every `HeadingWatch` has been dropped.
pub fn spawn_reader<R>(stream: R, cfg: ReaderConfig, status: Arc<Mutex<ImuStatus>>) -> (HeadingWatch, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = watch::channel(Heading::default());
    let handle = tokio::spawn(read_loop(stream, cfg, tx, status));
    (HeadingWatch { rx }, handle)
}

async fn read_loop<R>(mut stream: R, cfg: ReaderConfig, tx: watch::Sender<Heading>, status: Arc<Mutex<ImuStatus>>)
where
    R: AsyncRead + Unpin,
{
    let mut pipeline = ImuPipeline::new(cfg.max_buffer_bytes, cfg.max_rate_dps);
    let mut buf = vec![0u8; 1024];
    let mut at_eof = false;
    info!("imu: reader started");

    while !tx.is_closed() {
        match tokio::time::timeout(cfg.poll_interval, stream.read(&mut buf)).await {
            // nothing arrived this interval
            Err(_) => continue,
            Ok(Ok(0)) => {
                if !at_eof {
                    warn!("imu: serial stream closed (device unplugged?)");
                    at_eof = true;
                    if let Ok(mut st) = status.lock() {
                        st.connected = false;
                    }
                }
            }
            Ok(Ok(n)) => {
                at_eof = false;
                let heading = pipeline.feed(&buf[..n]);
                if let Some(h) = heading {
                    tx.send_replace(h);
                }
                if let Ok(mut st) = status.lock() {
                    let frames = pipeline.frame_sync().stats();
                    let stats = pipeline.stats();
                    st.connected = true;
                    st.frames_ok = stats.accepted;
                    st.frames_rejected = stats.rejected;
                    st.fragments_dropped = frames.fragments_dropped + frames.non_utf8_dropped;
                    st.overflows = frames.overflows;
                    if heading.is_some() {
                        st.last_sample = Some(Instant::now());
                    }
                }
            }
            Ok(Err(e)) => {
                warn!("imu: serial read failed: {}", e);
                if let Ok(mut st) = status.lock() {
                    st.read_errors += 1;
                }
            }
        }

        tokio::time::sleep(cfg.poll_interval).await;
    }

    info!("imu: reader stopped (no subscribers)");
}
