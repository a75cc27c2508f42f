use std::path::PathBuf;

use anyhow::Result;
use clap_serde_derive::ClapSerde;

use crate::error::ErrorPolicy;
use crate::inference::extract::OutputSelector;

/// File extension appended to the configured model name
pub(crate) const MODEL_EXTENSION: &str = "onnx";

#[derive(ClapSerde, Debug)]
pub struct Config {
    /// The address the listener binds to
    #[default(String::from("0.0.0.0"))]
    #[arg(short, long, env)]
    pub(crate) address: String,

    /// The port the listener binds to
    #[default(8080)]
    #[arg(short, long, env)]
    pub(crate) port: u16,

    /// Name of the model artifact, resolved to `<model_dir>/<model_name>.onnx`
    #[default(String::from("calibrated_classifier"))]
    #[arg(short, long, env)]
    pub(crate) model_name: String,

    /// Directory containing the model artifact
    #[default(PathBuf::from("."))]
    #[arg(long, env)]
    pub(crate) model_dir: PathBuf,

    /// Index of the model output holding the per-class probabilities
    #[default(1)]
    #[arg(long, env)]
    pub(crate) probability_output: usize,

    /// Column (or map key) of the positive class in the probability output
    #[default(1)]
    #[arg(long, env)]
    pub(crate) positive_class: usize,

    /// Number of threads used to parallelize a single inference
    #[default(1)]
    #[arg(long, env)]
    pub(crate) intra_threads: usize,

    /// Largest accepted request body in bytes
    #[default(10_000_000)]
    #[arg(long, env)]
    pub(crate) max_body_bytes: usize,

    /// Answer invalid request bodies with 400 instead of the generic 500
    #[default(false)]
    #[arg(long, env)]
    pub(crate) client_errors: bool,

    /// OpenTelemetry collector endpoint, console logging only when empty
    #[default(String::new())]
    #[arg(long, env)]
    pub(crate) otlp_endpoint: String,

    /// Keep console logging when exporting to a collector
    #[default(false)]
    #[arg(long, env)]
    pub(crate) console: bool,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        Self::from_toml_str(&str)
    }

    pub fn from_toml_str(str: &str) -> Result<Self> {
        let opt: <Config as ClapSerde>::Opt = toml::from_str(str)?;
        Ok(Config::from(opt))
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir
            .join(format!("{}.{}", self.model_name, MODEL_EXTENSION))
    }

    pub fn output_selector(&self) -> OutputSelector {
        OutputSelector {
            output_index: self.probability_output,
            positive_class: self.positive_class,
        }
    }

    pub fn otlp_endpoint(&self) -> Option<&str> {
        Some(self.otlp_endpoint.trim()).filter(|endpoint| !endpoint.is_empty())
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        if self.client_errors {
            ErrorPolicy::ReportInvalidInput
        } else {
            ErrorPolicy::Generic
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        opt: <Config as ClapSerde>::Opt,
    }

    fn parse(args: &[&str]) -> <Config as ClapSerde>::Opt {
        Cli::try_parse_from(std::iter::once("classifier_server").chain(args.iter().copied()))
            .unwrap()
            .opt
    }

    #[test]
    fn defaults_match_the_documented_contract() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.address, "0.0.0.0");
        assert_eq!(config.model_name, "calibrated_classifier");
        assert_eq!(
            config.model_path(),
            PathBuf::from(".").join("calibrated_classifier.onnx")
        );
        assert_eq!(config.output_selector(), OutputSelector::default());
        assert_eq!(config.error_policy(), ErrorPolicy::Generic);
        assert!(config.otlp_endpoint().is_none());
    }

    #[test]
    fn partial_toml_is_filled_with_defaults() {
        let config = Config::from_toml_str(
            r#"
            port = 9000
            model_name = "fraud"
            model_dir = "/models"
            client_errors = true
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.address, "0.0.0.0");
        assert_eq!(config.model_path(), PathBuf::from("/models/fraud.onnx"));
        assert_eq!(config.error_policy(), ErrorPolicy::ReportInvalidInput);
        assert!(config.otlp_endpoint().is_none());
    }

    #[test]
    fn otlp_endpoint_is_read_from_toml() {
        let config = Config::from_toml_str(r#"otlp_endpoint = "http://collector:4317""#).unwrap();
        assert_eq!(config.otlp_endpoint(), Some("http://collector:4317"));
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(Config::from_toml_str("port = \"eighty\"").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::from_toml("does/not/exist.toml").is_err());
    }

    #[test]
    fn flags_override_toml() {
        let toml = Config::from_toml_str(
            r#"
            port = 7000
            model_dir = "/models"
            "#,
        )
        .unwrap();
        let config = toml.merge(parse(&["--port", "9000", "--model-name", "fraud"]));

        assert_eq!(config.port, 9000);
        assert_eq!(config.model_path(), PathBuf::from("/models/fraud.onnx"));
        assert_eq!(config.address, "0.0.0.0");
    }

    #[test]
    fn absent_flags_keep_toml_values() {
        let toml = Config::from_toml_str(r#"model_dir = "/models""#).unwrap();
        let config = toml.merge(parse(&["--positive-class", "0"]));

        assert_eq!(config.model_dir, PathBuf::from("/models"));
        assert_eq!(
            config.output_selector(),
            OutputSelector {
                output_index: 1,
                positive_class: 0,
            }
        );
    }

    // Other tests parsing flags pass --port and --model-name explicitly while these are set.
    #[test]
    fn environment_sets_port_and_model_name() {
        std::env::set_var("PORT", "7070");
        std::env::set_var("MODEL_NAME", "from_env");

        let from_env = Config::default().merge(parse(&[]));
        let flag_wins = Config::default().merge(parse(&["--port", "9100"]));

        std::env::remove_var("PORT");
        std::env::remove_var("MODEL_NAME");

        assert_eq!(from_env.port, 7070);
        assert!(from_env.model_path().ends_with("from_env.onnx"));
        assert_eq!(flag_wins.port, 9100);
        assert!(flag_wins.model_path().ends_with("from_env.onnx"));
    }
}
