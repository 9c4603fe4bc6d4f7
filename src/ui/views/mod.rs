mod record;
mod rows;
mod table;

pub use record::RecordView;
pub use table::{EntityTableView, TableRow};
