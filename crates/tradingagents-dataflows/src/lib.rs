pub mod alpha_vantage;
pub mod catalog;
pub mod error;
pub mod interface;
pub mod local;
pub mod memory;
pub mod router;
pub mod vendor;

pub use alpha_vantage::AlphaVantageVendor;
pub use catalog::{tools_for, DataTool, ToolCategory};
pub use error::DataFetchError;
pub use interface::{DataInterface, ToolOutcome};
pub use local::LocalVendor;
pub use router::VendorRouter;
pub use vendor::{DataVendor, FetchRequest};
