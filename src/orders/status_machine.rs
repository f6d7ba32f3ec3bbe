use crate::auth::Role;
use crate::orders::OrderStatus;

/// Rejected transition, carrying what would have been legal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot move order from {from} to {to} as {role}; allowed: [{}]", format_allowed(.allowed))]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub role: Role,
    pub allowed: &'static [OrderStatus],
}

fn format_allowed(allowed: &[OrderStatus]) -> String {
    allowed
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Service for validating order status transitions per actor role
pub struct StatusMachine;

impl StatusMachine {
    /// Statuses `role` may move an order in `from` to
    ///
    /// # Transition tables
    /// Admin (full table):
    /// - pending → paid, cancelled
    /// - paid → confirmed, cancelled
    /// - confirmed → preparing, cancelled
    /// - preparing → ready
    /// - ready → collected
    ///
    /// Owner: pending|paid → confirmed → preparing → ready → collected
    ///
    /// Customer: pending|paid → cancelled
    pub fn allowed(from: OrderStatus, role: Role) -> &'static [OrderStatus] {
        use OrderStatus::*;

        match role {
            Role::Admin => match from {
                Pending => &[Paid, Cancelled],
                Paid => &[Confirmed, Cancelled],
                Confirmed => &[Preparing, Cancelled],
                Preparing => &[Ready],
                Ready => &[Collected],
                Collected | Cancelled => &[],
            },
            Role::Owner => match from {
                Pending | Paid => &[Confirmed],
                Confirmed => &[Preparing],
                Preparing => &[Ready],
                Ready => &[Collected],
                Collected | Cancelled => &[],
            },
            Role::Customer => match from {
                Pending | Paid => &[Cancelled],
                Confirmed | Preparing | Ready | Collected | Cancelled => &[],
            },
        }
    }

    /// Check if a status transition is valid for the role
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus, role: Role) -> bool {
        Self::allowed(from, role).contains(&to)
    }

    /// Attempt to transition from one status to another
    pub fn transition(
        from: OrderStatus,
        to: OrderStatus,
        role: Role,
    ) -> Result<OrderStatus, TransitionError> {
        if Self::is_valid_transition(from, to, role) {
            Ok(to)
        } else {
            Err(TransitionError {
                from,
                to,
                role,
                allowed: Self::allowed(from, role),
            })
        }
    }

    /// A preparation estimate may only accompany a move into `confirmed`
    pub fn accepts_preparation_time(to: OrderStatus) -> bool {
        to == OrderStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_admin_happy_path() {
        let path = [Pending, Paid, Confirmed, Preparing, Ready, Collected];
        for pair in path.windows(2) {
            assert_eq!(StatusMachine::transition(pair[0], pair[1], Role::Admin), Ok(pair[1]));
        }
    }

    #[test]
    fn test_owner_path_skips_paid() {
        assert!(StatusMachine::is_valid_transition(Pending, Confirmed, Role::Owner));
        assert!(StatusMachine::is_valid_transition(Paid, Confirmed, Role::Owner));
        assert!(!StatusMachine::is_valid_transition(Pending, Paid, Role::Owner));
        assert!(!StatusMachine::is_valid_transition(Pending, Cancelled, Role::Owner));
        assert!(!StatusMachine::is_valid_transition(Confirmed, Cancelled, Role::Owner));
    }

    #[test]
    fn test_customer_can_only_cancel_before_confirmation() {
        assert!(StatusMachine::is_valid_transition(Pending, Cancelled, Role::Customer));
        assert!(StatusMachine::is_valid_transition(Paid, Cancelled, Role::Customer));
        assert!(!StatusMachine::is_valid_transition(Confirmed, Cancelled, Role::Customer));
        assert!(!StatusMachine::is_valid_transition(Pending, Paid, Role::Customer));
    }

    #[test]
    fn test_ready_cannot_go_back_to_confirmed() {
        let error = StatusMachine::transition(Ready, Confirmed, Role::Admin).unwrap_err();
        assert_eq!(error.from, Ready);
        assert_eq!(error.allowed, &[Collected]);
        assert!(error.to_string().contains("allowed: [collected]"));
    }

    #[test]
    fn test_preparing_cannot_be_cancelled() {
        assert!(!StatusMachine::is_valid_transition(Preparing, Cancelled, Role::Admin));
    }

    #[test]
    fn test_same_status_is_rejected() {
        assert!(StatusMachine::transition(Pending, Pending, Role::Admin).is_err());
    }

    #[test]
    fn test_preparation_time_only_on_confirm() {
        assert!(StatusMachine::accepts_preparation_time(Confirmed));
        assert!(!StatusMachine::accepts_preparation_time(Preparing));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = OrderStatus> {
        prop::sample::select(OrderStatus::ALL.to_vec())
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(vec![Role::Customer, Role::Owner, Role::Admin])
    }

    /// Terminal states have no outbound transitions for any role
    #[test]
    fn prop_terminal_states_are_final() {
        proptest!(|(to in any_status(), role in any_role())| {
            prop_assert!(!StatusMachine::is_valid_transition(OrderStatus::Collected, to, role));
            prop_assert!(!StatusMachine::is_valid_transition(OrderStatus::Cancelled, to, role));
        });
    }

    /// Owner and customer moves are always a subset of the admin table,
    /// except the owner confirming an unpaid order
    #[test]
    fn prop_role_tables_within_admin_table() {
        proptest!(|(from in any_status(), to in any_status())| {
            if StatusMachine::is_valid_transition(from, to, Role::Customer) {
                prop_assert!(StatusMachine::is_valid_transition(from, to, Role::Admin));
            }
            if StatusMachine::is_valid_transition(from, to, Role::Owner)
                && !(from == OrderStatus::Pending && to == OrderStatus::Confirmed)
            {
                prop_assert!(StatusMachine::is_valid_transition(from, to, Role::Admin));
            }
        });
    }

    /// Owners never cancel and never mark orders paid
    #[test]
    fn prop_owner_never_cancels_or_marks_paid() {
        proptest!(|(from in any_status())| {
            prop_assert!(!StatusMachine::is_valid_transition(from, OrderStatus::Cancelled, Role::Owner));
            prop_assert!(!StatusMachine::is_valid_transition(from, OrderStatus::Paid, Role::Owner));
        });
    }

    /// A rejected transition reports exactly the allowed set
    #[test]
    fn prop_error_reports_allowed_set() {
        proptest!(|(from in any_status(), to in any_status(), role in any_role())| {
            match StatusMachine::transition(from, to, role) {
                Ok(next) => prop_assert_eq!(next, to),
                Err(e) => {
                    prop_assert_eq!(e.allowed, StatusMachine::allowed(from, role));
                    prop_assert!(!e.allowed.contains(&to));
                }
            }
        });
    }
}
