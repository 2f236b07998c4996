//! Mesh failure arbitration for the cluster coordination layer.
//!
//! When one or more peer sites in a full mesh are suspected failed, every
//! survivor runs the same arbitration protocol and converges on an identical
//! kill set of sites to evict, plus a safe transaction watermark per evicted
//! site so the survivors can resume coordinated work without losing ordering
//! guarantees.
//!
//! # Architecture
//!
//! ```text
//! MeshArbiter (drain faults -> send -> receive -> resolve -> commit)
//!   ├── Discard classifier (suicide / known / stale filtering)
//!   ├── AgreementSeeker (accusation graph + kill-set strategy)
//!   ├── FailureUpdateLedger ((reporter, subject) -> safe txn id)
//!   ├── Mailbox (subject-filtered peer messaging)
//!   └── MeshAide (safe txn oracle + heartbeats)
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use mesh_arbiter::{MemoryHub, MeshArbiter};
//!
//! let hub = MemoryHub::new();
//! let mut arbiter = MeshArbiter::new(self_hsid, hub.mailbox(self_hsid), aide);
//!
//! // The fault detector hands over a FaultMessage; an empty map means no
//! // decision yet, keep pumping.
//! let decision = arbiter.reconfigure_on_fault(&mesh, fault)?;
//! for (site, safe_txn_id) in decision {
//!     // disconnect `site`, recover up to `safe_txn_id`
//! }
//! ```

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod aide;
pub mod arbiter;
pub mod error;
pub mod ledger;
pub mod mailbox;
pub mod messages;
pub mod seeker;

// Re-exports
pub use aide::MeshAide;
pub use arbiter::{ArbiterConfig, ArbiterProbe, Discard, MeshArbiter};
pub use error::{ArbiterError, Result};
pub use ledger::FailureUpdateLedger;
pub use mailbox::{Mailbox, MemoryHub, MemoryMailbox};
pub use messages::{
    ArbiterMessage, FaultMessage, Hsid, SiteFailureForwardMessage, SiteFailureMessage,
    SiteFailureMessageBuilder, Subject,
};
pub use seeker::{AgreementSeeker, ArbitrationStrategy};
