//! Ledger Server - order and installment ledger for a retail storefront
//!
//! # Overview
//!
//! Back-office engine covering:
//!
//! - **Stock ledger** (`ledger::stock`): atomic multi-item reservation tied
//!   to the order lifecycle
//! - **Order ledger** (`ledger::orders`): status machine, installment
//!   accounts with partial payments and reversals, manual commission pin
//! - **Commission payroll** (`ledger::payroll`): batch settlement of earned
//!   commissions
//! - **Document store** (`store`): versioned documents with atomic batches,
//!   backed by redb or memory
//! - **HTTP API** (`api`): RESTful surface for the seller console
//!
//! # Module layout
//!
//! ```text
//! ledger-server/src/
//! ├── core/          # config, state, server
//! ├── store/         # document store contract + backends
//! ├── db/            # typed repositories
//! ├── ledger/        # business rules
//! ├── feed/          # change feed -> live console state
//! ├── audit/         # audit trail
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # errors, logging
//! ```

pub mod api;
pub mod audit;
pub mod core;
pub mod db;
pub mod feed;
pub mod ledger;
pub mod notify;
pub mod store;
pub mod utils;

pub use crate::core::{Config, Server, ServerState, StoreBackend};
pub use ledger::{CommissionPayroll, LedgerError, OrderLedger, StockLedger};
pub use utils::{AppError, AppResult};
pub use utils::logger::{init_logger, init_logger_with_file};

/// Prepare the process environment: .env file, working directory, logging.
pub fn setup_environment() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;

    if config.is_production() {
        let log_dir = std::path::Path::new(&config.work_dir).join("logs");
        std::fs::create_dir_all(&log_dir)?;
        init_logger_with_file(Some("info"), log_dir.to_str());
    } else {
        init_logger();
    }
    Ok(())
}
