//! Input optimization: rule-based text shortening, the local arithmetic
//! shortcut, and savings accounting.

pub mod arithmetic;
pub mod contractions;
pub mod expression;
pub mod normalizer;
pub mod savings;
pub mod stopwords;

pub use arithmetic::{ArithmeticOutcome, ArithmeticShortcut};
pub use contractions::{ContractionTable, CONTRACTIONS};
pub use expression::evaluate_expression;
pub use normalizer::{word_count, TextNormalizer};
pub use savings::{Co2Report, EnergyEstimate, ModelEnergyTable, ReportFigure, SavingsAccountant};
pub use stopwords::{StopwordList, StopwordLoad};
