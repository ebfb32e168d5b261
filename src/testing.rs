//! Testing utilities for scheduling pipelines.
//!
//! This module provides the building blocks the crate's own tests use and
//! that downstream users can reuse to test their scheduling setups:
//!
//! - **Builders**: construct plan rows and reference data fluently
//! - **Assertions**: check scheduling invariants over pipeline outputs
//! - **Fixtures**: pre-built rows and reference data for common scenarios
//!
//! # Quick Start
//!
//! ```no_run
//! use leafline::testing::*;
//! use leafline::{InMemoryReference, InMemorySequence, Scheduler};
//!
//! #[test]
//! fn schedules_one_row() {
//!     let scheduler = Scheduler::new(
//!         Box::new(InMemoryReference::new()),
//!         Box::new(InMemorySequence::new()),
//!     );
//!
//!     let row = PlanRowBuilder::new("W0001")
//!         .article("HNZJHYLC001")
//!         .makers("C1")
//!         .feeder("F001")
//!         .window("2024-10-16 08:00", "2024-10-16 20:00")
//!         .final_quantity(100)
//!         .build();
//!
//!     let result = scheduler.run(vec![row]);
//!     assert!(result.success);
//!     assert_plan_id_formats(&result.mes_orders);
//! }
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;

// Re-export commonly used items
pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
