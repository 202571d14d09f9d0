//! brandhub-store: the tenant-aware data gateway.
//!
//! ```rust,no_run
//! # async fn demo(gateway: &brandhub_store::TenantGateway) -> anyhow::Result<()> {
//! use brandhub_core::{context, TenantContext};
//! use brandhub_store::Task;
//!
//! context::scope(TenantContext::new("branda"), async {
//!     let mut session = gateway.begin(None).await?;
//!     session.insert(Task::new(1, "vintage bikes")).await?;
//!     session.commit()
//! })
//! .await
//! # }
//! ```

pub mod entities;
pub mod gateway;
pub mod memory;
pub mod record;
pub mod session;

pub use entities::{BrandAdmin, ContactRequest, Task, User};
pub use gateway::TenantGateway;
pub use memory::TenantStore;
pub use record::{Record, Scope};
pub use session::Session;
