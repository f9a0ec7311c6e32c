pub mod analytics;
pub mod config;
pub mod data;
pub mod exposure;
pub mod flow;
pub mod pipeline;
pub mod regime;
pub mod technicals;
pub mod thesis;

// Re-export commonly used types
pub use analytics::{FirstPassageEstimator, LevelArrival, Urgency};
pub use config::{load_config, AnalysisConfig, ConfigError, CONFIG_VERSION};
pub use data::{DailyBar, IntradayBar, LoaderError, MarketSnapshot, SnapshotLoader, StrikeRecord};
pub use exposure::{BlackScholes, ExposureCalculator, ExposureProfile, GammaRegime};
pub use flow::{FlowPressureEstimator, FlowRegime};
pub use pipeline::{AnalysisReport, RegimeAnalyzer};
pub use regime::{AutocorrelationRegime, EntropyRegime, PhaseRegime, SelfExcitationRegime};
pub use technicals::{TrendAnalyzer, TrendContext};
pub use thesis::{Confidence, Direction, Strength, Thesis, ThesisLabel};
