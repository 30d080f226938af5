use crate::CoreError;
use wpstack_store::EnvState;

/// Reject lifecycle transitions the orchestrator never performs.
///
/// `Starting` may be re-entered from any existing state so that a timed-out
/// or half-stopped environment can always be resolved by another `up`, and
/// `Stopping` likewise by another `down`.
pub fn validate_transition(from: EnvState, to: EnvState) -> Result<(), CoreError> {
    use EnvState::{Absent, Created, DegradedWait, Ready, Starting, Stopped, Stopping};

    let valid = match to {
        Created => from == Absent,
        Starting | Stopping => from != Absent,
        DegradedWait => from == Starting,
        Ready => from == DegradedWait,
        Stopped => from == Stopping,
        Absent => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EnvState::{Absent, Created, DegradedWait, Ready, Starting, Stopped, Stopping};

    #[test]
    fn valid_transitions() {
        assert!(validate_transition(Absent, Created).is_ok());
        assert!(validate_transition(Created, Starting).is_ok());
        assert!(validate_transition(Stopped, Starting).is_ok());
        assert!(validate_transition(Starting, DegradedWait).is_ok());
        assert!(validate_transition(DegradedWait, Ready).is_ok());
        assert!(validate_transition(Ready, Starting).is_ok());
        assert!(validate_transition(DegradedWait, Starting).is_ok()); // retry after timeout
        assert!(validate_transition(Ready, Stopping).is_ok());
        assert!(validate_transition(DegradedWait, Stopping).is_ok());
        assert!(validate_transition(Stopping, Stopped).is_ok());
        assert!(validate_transition(Stopping, Starting).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        assert!(validate_transition(Absent, Starting).is_err());
        assert!(validate_transition(Absent, Stopping).is_err());
        assert!(validate_transition(Created, Ready).is_err());
        assert!(validate_transition(Starting, Ready).is_err());
        assert!(validate_transition(Stopped, DegradedWait).is_err());
        assert!(validate_transition(Ready, Stopped).is_err());
        assert!(validate_transition(Created, Created).is_err());
        assert!(validate_transition(Stopped, Absent).is_err());
    }
}
