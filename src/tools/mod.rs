//! Tools module - local tool implementations for the agent
//!
//! Contains the sales data query tool, its argument/result codec and the
//! tool registry.

pub mod codec;
pub mod registry;
pub mod sales_data;

pub use registry::{Tool, ToolRegistry};
pub use sales_data::{SalesData, SalesDataTool, FETCH_SALES_DATA_TOOL, NO_RESULTS};
