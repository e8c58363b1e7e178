//! Minimal command-line front end around the recording core.
//!
//! Stands in for the GUI collaborator: it supplies an output path, frame
//! rate, optional region and audio flag, records for a fixed number of
//! seconds, then stops.
//!
//! ```text
//! recap OUTPUT [--fps N] [--seconds N] [--region X,Y,WxH] [--audio]
//! recap --config session.json [--seconds N]
//! ```

use anyhow::{bail, Context, Result};
use recap::{CaptureRegion, Recorder, SessionConfig};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (config, seconds) = parse_args()?;

    let mut recorder = Recorder::new();
    recorder.start(config).context("could not start recording")?;
    tracing::info!("recording for {seconds} seconds");
    std::thread::sleep(Duration::from_secs(seconds));

    let summary = recorder.stop().context("could not stop recording")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn parse_args() -> Result<(SessionConfig, u64)> {
    let mut args = std::env::args().skip(1);
    let mut config: Option<SessionConfig> = None;
    let mut seconds = 10u64;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a file path")?;
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {path}"))?;
                config = Some(serde_json::from_str(&text).context("invalid session config")?);
            }
            "--fps" => {
                let value = args.next().context("--fps needs a value")?;
                config
                    .as_mut()
                    .context("give the output path before --fps")?
                    .frame_rate = value.parse().context("invalid --fps value")?;
            }
            "--seconds" => {
                let value = args.next().context("--seconds needs a value")?;
                seconds = value.parse().context("invalid --seconds value")?;
            }
            "--region" => {
                let value = args.next().context("--region needs X,Y,WxH")?;
                config
                    .as_mut()
                    .context("give the output path before --region")?
                    .region = Some(parse_region(&value)?);
            }
            "--audio" => {
                config
                    .as_mut()
                    .context("give the output path before --audio")?
                    .audio_enabled = true;
            }
            other if !other.starts_with('-') => {
                config = Some(SessionConfig::new(other));
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    let config = config.context("usage: recap OUTPUT [--fps N] [--seconds N] [--region X,Y,WxH] [--audio]")?;
    Ok((config, seconds))
}

fn parse_region(value: &str) -> Result<CaptureRegion> {
    // Format: "X,Y,WxH", e.g. "0,0,1280x720"
    let (origin, size) = value
        .rsplit_once(',')
        .context("region must be X,Y,WxH")?;
    let (x, y) = origin.split_once(',').context("region must be X,Y,WxH")?;
    let (w, h) = size.split_once('x').context("region must be X,Y,WxH")?;
    Ok(CaptureRegion::new(
        x.parse().context("invalid region x")?,
        y.parse().context("invalid region y")?,
        w.parse().context("invalid region width")?,
        h.parse().context("invalid region height")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let region = parse_region("10,20,1280x720").unwrap();
        assert_eq!((region.x, region.y), (10, 20));
        assert_eq!((region.width, region.height), (1280, 720));
    }

    #[test]
    fn test_parse_region_rejects_garbage() {
        assert!(parse_region("nope").is_err());
        assert!(parse_region("1,2,3").is_err());
    }
}
