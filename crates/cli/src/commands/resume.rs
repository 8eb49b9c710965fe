//! `mailgate resume`: answer a pending review request.

use anyhow::Context;
use mailgate_core::review::ReviewOutcome;
use mailgate_core::run::RunId;
use std::path::Path;

use super::runtime::Runtime;

pub async fn run(config_path: Option<&Path>, run_id: &str, outcome: &str) -> anyhow::Result<()> {
    let outcome = parse_outcome(outcome)?;
    let runtime = Runtime::build(config_path).await?;

    let result = runtime.controller.resume(&RunId(run_id.to_string()), outcome).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn parse_outcome(raw: &str) -> anyhow::Result<ReviewOutcome> {
    serde_json::from_str(raw).with_context(|| {
        format!("Invalid outcome {raw}; expected e.g. {{\"type\":\"accept\"}}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_outcome_shape() {
        assert_eq!(parse_outcome(r#"{"type":"accept"}"#).unwrap(), ReviewOutcome::Accept);
        assert_eq!(parse_outcome(r#"{"type":"abort"}"#).unwrap(), ReviewOutcome::Abort);
        assert_eq!(
            parse_outcome(r#"{"type":"response","args":"Make it shorter"}"#).unwrap(),
            ReviewOutcome::Respond("Make it shorter".into())
        );
        assert!(matches!(
            parse_outcome(r#"{"type":"edit","args":{"subject":"New"}}"#).unwrap(),
            ReviewOutcome::Edit(_)
        ));
    }

    #[test]
    fn rejects_unknown_outcome() {
        assert!(parse_outcome(r#"{"type":"maybe"}"#).is_err());
    }
}
