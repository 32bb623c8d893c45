//! Expenses, installment plans and the endpoints for managing them.

mod db;
mod domain;
mod handlers;
mod installment;

pub use db::{ExpenseFilter, create_expense_table, create_expenses, query_expenses};
pub use domain::{
    Expense, ExpenseForm, ExpenseId, ExpenseUpdate, ExpenseUpdateForm, ExpenseWithRelations,
    PaymentMethod, ReimbursementStatus,
};
pub use handlers::{
    create_expense_endpoint, delete_expense_endpoint, get_expense_endpoint,
    list_expenses_endpoint, update_expense_endpoint,
};
pub use installment::{
    ExpenseSubmission, InstallmentCount, NewExpense, RemainderPolicy, expand_installments,
};
