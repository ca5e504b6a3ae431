//! Analyze command implementation

use crate::agent::{factory::create_agent, AnalysisClient, AnalysisResult};
use crate::capture::{preprocess, FileFrameSource, FrameSource};
use crate::cli::output::format_result;
use crate::cli::AnalyzeArgs;
use std::sync::Arc;
use std::time::Duration;

/// Handle `studycam analyze` command
///
/// Runs one analysis of an image file. The result is printed, never stored.
pub async fn handle_analyze(args: &AnalyzeArgs) -> Result<String, Box<dyn std::error::Error>> {
    let mut config = super::load_config(&args.config)?;
    if let Some(provider) = args.provider {
        config.analysis.provider = provider;
    }
    config.validate()?;

    let frame = FileFrameSource::new(&args.image)
        .capture()
        .await?
        .ok_or_else(|| format!("No image data in {}", args.image.display()))?;

    // Same fallback as the capture loop: an undecodable frame is sent as is
    let frame = if config.capture.preprocess && !args.no_preprocess {
        preprocess::enhance_or_raw(frame)
    } else {
        frame
    };

    let http = Arc::new(reqwest::Client::builder().build()?);
    let agent = create_agent(&config.analysis, http)?;
    let client = AnalysisClient::new(agent, Duration::from_secs(config.analysis.timeout_seconds));

    let result = client.analyze(&frame).await;
    render(&result, args.json)
}

fn render(result: &AnalysisResult, json: bool) -> Result<String, Box<dyn std::error::Error>> {
    if json {
        Ok(serde_json::to_string_pretty(result)?)
    } else {
        Ok(format_result(result))
    }
}
