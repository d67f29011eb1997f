pub mod format;
pub mod statement;

pub use format::FormatType;
pub use statement::{
    DematAccount, Holding, InvestorInfo, Metadata, MutualFundFolio, ParsedStatement,
    SchemeValuation, Summary,
};
