//! Borrow/return state machine for a single catalog entry.
//!
//! A book is either on the shelf or held by exactly one user. Moving a book
//! from one borrower to another always goes through `Available`.

use crate::{
    books::repo_types::Book,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingState {
    Available,
    Borrowed { borrower_id: i64 },
}

impl LendingState {
    pub fn borrow(self, user_id: i64) -> AppResult<Self> {
        match self {
            LendingState::Available => Ok(LendingState::Borrowed {
                borrower_id: user_id,
            }),
            LendingState::Borrowed { .. } => Err(AppError::NotAvailable),
        }
    }

    pub fn give_back(self) -> AppResult<Self> {
        match self {
            LendingState::Borrowed { .. } => Ok(LendingState::Available),
            LendingState::Available => Err(AppError::NotBorrowed),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, LendingState::Available)
    }

    pub fn borrower_id(&self) -> Option<i64> {
        match self {
            LendingState::Available => None,
            LendingState::Borrowed { borrower_id } => Some(*borrower_id),
        }
    }
}

impl Book {
    pub fn lending(&self) -> LendingState {
        match self.borrower_id {
            Some(borrower_id) => LendingState::Borrowed { borrower_id },
            None => LendingState::Available,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.available == self.borrower_id.is_none()
    }
}
