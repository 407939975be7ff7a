//! Property tests for parameter validation.

use proptest::prelude::*;
use srs_filter::{FilterError, FilterMode, FilterParams, OutputType};

fn arb_mode() -> impl Strategy<Value = FilterMode> {
    prop::sample::select(FilterMode::ALL.to_vec())
}

fn arb_output() -> impl Strategy<Value = OutputType> {
    prop_oneof![Just(OutputType::Model), Just(OutputType::Segmentation)]
}

/// Parameters with every numeric field inside its range.
fn arb_valid_params() -> impl Strategy<Value = FilterParams> {
    (
        (0.0..=50.0f64, 0.1..=50.0f64, 0.1..=10.0f64),
        (1u32..=10, 0u32..=10),
        (0.01..=10.0f64, 0.1..=20.0f64, 0.0..=1.0f64),
        arb_mode(),
    )
        .prop_map(|((offset, s1, s2), (n, m), (dist, thick, smooth), mode)| {
            FilterParams::default()
                .with_offset(offset)
                .with_spacing(s1, s2)
                .with_iterations(n, m)
                .with_max_model_distance(dist)
                .with_thickness(thick)
                .with_smoothing(smooth)
                .with_filter_mode(mode)
        })
}

proptest! {
    #[test]
    fn in_range_model_params_validate(params in arb_valid_params()) {
        prop_assert!(params.validate().is_ok());
    }

    #[test]
    fn segmentation_output_needs_closed_surface(params in arb_valid_params()) {
        let params = params.with_output_type(OutputType::Segmentation);
        let result = params.validate();
        if params.filter_mode == FilterMode::NonManifold {
            let incompatible = matches!(result, Err(FilterError::IncompatibleOutput { .. }));
            prop_assert!(incompatible);
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn smoothing_above_one_is_rejected(params in arb_valid_params(), excess in 1e-6..10.0f64) {
        let params = params.with_smoothing(1.0 + excess);
        let rejected = matches!(
            params.validate(),
            Err(FilterError::InvalidParameter { name: "smoothing_factor", .. })
        );
        prop_assert!(rejected);
    }

    #[test]
    fn negative_offset_is_rejected(params in arb_valid_params(), offset in -100.0..-1e-9f64) {
        prop_assert!(params.with_offset(offset).validate().is_err());
    }

    #[test]
    fn mode_names_parse_back(mode in arb_mode(), output in arb_output()) {
        prop_assert_eq!(mode.as_str().parse::<FilterMode>().unwrap(), mode);
        prop_assert_eq!(output.as_str().parse::<OutputType>().unwrap(), output);
    }
}

#[cfg(feature = "params-config")]
proptest! {
    #[test]
    fn valid_params_survive_toml(params in arb_valid_params()) {
        let text = params.to_toml().unwrap();
        prop_assert_eq!(FilterParams::from_toml(&text).unwrap(), params);
    }
}
