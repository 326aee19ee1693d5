use crate::sensor::Reading;

/// Hysteresis band for the humidity alert. An alert fires when humidity rises
/// strictly above `trigger`; the armed state only clears again once humidity
/// falls to `reset` or below. Readings between the two leave the state
/// untouched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub trigger: f32,
    pub reset: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            trigger: 50.0,
            reset: 49.0,
        }
    }
}

/// What the current sample asks the cycle to do with the warning flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertAction {
    /// Humidity crossed the trigger threshold while idle: send the alert and
    /// persist the flag as set.
    Trigger,
    /// Humidity dropped back through the reset threshold: clear the persisted
    /// flag, silently.
    Disarm,
    /// No state change.
    Hold,
}

/// Edge-triggered evaluation of one humidity sample against the persisted
/// `sent_warning` flag. A NaN humidity never changes state (NaN comparisons
/// are all false).
pub fn evaluate(sent_warning: bool, humidity: f32, thresholds: &Thresholds) -> AlertAction {
    if sent_warning {
        if humidity <= thresholds.reset {
            AlertAction::Disarm
        } else {
            AlertAction::Hold
        }
    } else if humidity > thresholds.trigger {
        AlertAction::Trigger
    } else {
        AlertAction::Hold
    }
}

/// The alert text sent through the messaging webhook. Asterisks are the
/// messenger's bold markup.
pub fn alert_message(reading: &Reading, thresholds: &Thresholds) -> String {
    format!(
        "*Humidity too high!*\n\
         The humidity in the monitored room is > {:.0}%.\n\n\
         Humidity: *{}* %\n\
         Temperature: *{}* *C",
        thresholds.trigger,
        reading.humidity_payload(),
        reading.temperature_payload(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: Thresholds = Thresholds {
        trigger: 50.0,
        reset: 49.0,
    };

    #[test]
    fn idle_triggers_above_threshold() {
        assert_eq!(evaluate(false, 50.1, &DEFAULTS), AlertAction::Trigger);
        assert_eq!(evaluate(false, 85.0, &DEFAULTS), AlertAction::Trigger);
    }

    #[test]
    fn idle_holds_at_or_below_trigger() {
        // The trigger comparison is strict: exactly 50.0 does not fire.
        assert_eq!(evaluate(false, 50.0, &DEFAULTS), AlertAction::Hold);
        assert_eq!(evaluate(false, 12.0, &DEFAULTS), AlertAction::Hold);
    }

    #[test]
    fn armed_disarms_at_or_below_reset() {
        assert_eq!(evaluate(true, 49.0, &DEFAULTS), AlertAction::Disarm);
        assert_eq!(evaluate(true, 10.0, &DEFAULTS), AlertAction::Disarm);
    }

    #[test]
    fn armed_holds_inside_dead_band() {
        // (49.0, 50.0] is a dead zone while armed: no re-alert, no disarm.
        assert_eq!(evaluate(true, 49.5, &DEFAULTS), AlertAction::Hold);
        assert_eq!(evaluate(true, 50.0, &DEFAULTS), AlertAction::Hold);
        assert_eq!(evaluate(true, 70.0, &DEFAULTS), AlertAction::Hold);
    }

    #[test]
    fn nan_humidity_never_changes_state() {
        assert_eq!(evaluate(false, f32::NAN, &DEFAULTS), AlertAction::Hold);
        assert_eq!(evaluate(true, f32::NAN, &DEFAULTS), AlertAction::Hold);
    }

    #[test]
    fn message_embeds_both_values() {
        let reading = Reading::new(55.0, 22.0);
        let message = alert_message(&reading, &DEFAULTS);
        assert!(message.contains("55.00"));
        assert!(message.contains("22.00"));
        assert!(message.starts_with("*Humidity too high!*"));
    }
}
