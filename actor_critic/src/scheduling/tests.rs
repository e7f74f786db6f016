//! Behavioral tests for the learning rate schedulers.

use super::*;

const EPS: f64 = 1e-12;

mod constant_lr_tests {
    use super::*;

    #[test]
    fn should_return_same_lr_for_any_step() {
        let sched = ConstantLR::new(0.001);
        assert_eq!(sched.get_lr(0), 0.001);
        assert_eq!(sched.get_lr(1_000_000), 0.001);
        assert_eq!(sched.get_lr(usize::MAX), 0.001);
    }
}

mod linear_decay_tests {
    use super::*;

    #[test]
    fn should_interpolate_linearly() {
        let sched = LinearDecay::new(1.0, 0.0, 100);
        assert!((sched.get_lr(0) - 1.0).abs() < EPS);
        assert!((sched.get_lr(50) - 0.5).abs() < EPS);
        assert!((sched.get_lr(100) - 0.0).abs() < EPS);
    }

    #[test]
    fn should_hold_end_lr_after_total_steps() {
        let sched = LinearDecay::new(1e-3, 1e-4, 10);
        assert!((sched.get_lr(11) - 1e-4).abs() < EPS);
        assert!((sched.get_lr(usize::MAX) - 1e-4).abs() < EPS);
    }
}

mod warmup_tests {
    use super::*;

    #[test]
    fn should_ramp_then_delegate() {
        let sched = Warmup::new(LinearDecay::new(1.0, 0.0, 10), 10, 0.0);
        assert!((sched.get_lr(0) - 0.0).abs() < EPS);
        assert!((sched.get_lr(5) - 0.5).abs() < EPS);
        // Inner schedule starts at the end of warmup.
        assert!((sched.get_lr(10) - 1.0).abs() < EPS);
        assert!((sched.get_lr(15) - 0.5).abs() < EPS);
    }

    #[test]
    fn should_skip_ramp_with_zero_warmup_steps() {
        let sched = Warmup::new(ConstantLR::new(0.3), 0, 0.0);
        assert!((sched.get_lr(0) - 0.3).abs() < EPS);
    }
}

mod multifactor_tests {
    use super::*;

    #[test]
    fn should_start_at_zero() {
        let sched = MultifactorSchedule::new(0.1, 400);
        assert_eq!(sched.get_lr(0), 0.0);
    }

    #[test]
    fn should_warm_up_linearly() {
        let sched = MultifactorSchedule::new(0.1, 400);
        let expected = 0.1 * (100.0 / 400.0) / 400f64.sqrt();
        assert!((sched.get_lr(100) - expected).abs() < EPS);
    }

    #[test]
    fn should_peak_at_warmup_end() {
        let sched = MultifactorSchedule::new(0.1, 400);
        let peak = sched.get_lr(400);
        assert!((peak - 0.1 / 20.0).abs() < EPS);
        assert!(sched.get_lr(399) < peak);
        assert!(sched.get_lr(401) < peak);
    }

    #[test]
    fn should_decay_as_inverse_sqrt() {
        let sched = MultifactorSchedule::new(0.1, 400);
        assert!((sched.get_lr(1600) - 0.1 / 40.0).abs() < EPS);
        assert!((sched.get_lr(1600) * 2.0 - sched.get_lr(400)).abs() < EPS);
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn default_is_multifactor() {
        let lr = ScheduleConfig::default().build().get_lr(400);
        assert!((lr - MultifactorSchedule::default().get_lr(400)).abs() < EPS);
    }

    #[test]
    fn parses_tagged_json() {
        let config: ScheduleConfig =
            serde_json::from_str(r#"{ "type": "constant", "lr": 0.01 }"#).unwrap();
        assert_eq!(config, ScheduleConfig::Constant { lr: 0.01 });
        assert_eq!(config.build().get_lr(123), 0.01);
    }

    #[test]
    fn warmup_constant_ramps_from_zero() {
        let sched = ScheduleConfig::WarmupConstant {
            lr: 1.0,
            warmup_steps: 4,
        }
        .build();
        assert!((sched.get_lr(2) - 0.5).abs() < EPS);
        assert!((sched.get_lr(4) - 1.0).abs() < EPS);
    }
}
