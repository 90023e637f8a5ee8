pub const EXPENSES_COLLECTION: &str = "expenses";

pub const EXPENSE_ADDED: &str = "EXPENSE_ADDED";
pub const EXPENSE_DELETED: &str = "EXPENSE_DELETED";
pub const USER_SIGNED_OUT: &str = "USER_SIGNED_OUT";
