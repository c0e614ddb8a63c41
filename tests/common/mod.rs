pub const ITEMS_MEDIUM: usize = 200;
pub const ITEMS_HIGH: usize = 1000;
