pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::{backend_label, draw_header, HeaderInfo};
pub use utils::{
  active_status_color, booking_status_color, cell, stock_status_color, transaction_status_color,
};
