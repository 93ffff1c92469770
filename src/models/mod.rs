pub mod due_item;
pub mod notion_row;

pub use due_item::{DueItem, ItemKind, TaskStatus};
pub use notion_row::{NotionRow, RowChange};
