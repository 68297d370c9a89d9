mod api;
mod portfolio;
mod position;
mod transaction;
mod sector;
pub mod alert;
pub mod report;
pub mod risk;
pub mod risk_settings;

pub use api::ApiResponse;
pub use portfolio::{CreatePortfolio, Portfolio, PortfolioSummary, UpdatePortfolio};
pub use position::{CreatePosition, Position, PriceUpdate, StockPrice, UpdatePosition, ValuedPosition};
pub use transaction::{CreateTransaction, TradeOutcome, TradeSide, Transaction};
pub use sector::Sector;
pub use alert::{RebalanceAction, RebalanceSuggestion, StopLossAlert, TakeProfitAlert, TriggerAlerts};
pub use report::PortfolioReport;
pub use risk::{
    PositionRisk, RiskAssessment, RiskDistribution, RiskFactor, RiskLevel, RiskStatus, SectorRisk,
};
pub use risk_settings::{RiskLevelSource, RiskSettings, UpdateRiskSettings};
