use super::*;
use crate::config::Config;

#[cfg(test)]
mod weather_tests {
    use super::*;

    #[test]
    fn echoes_city_with_fixed_conditions() {
        for city in ["San Francisco", "Paris", "", "  spaced  ", "東京"] {
            let report = get_weather(city);

            assert_eq!(report.city, city);
            assert_eq!(report.temperature, "22°C");
            assert_eq!(report.condition, "Partly cloudy");
            assert_eq!(report.humidity, "65%");
            assert_eq!(report.wind_speed, "15 km/h");
            assert_eq!(report.timestamp, "2024-01-15T10:30:00Z");
        }
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let value = serde_json::to_value(get_weather("Oslo")).expect("report serializes");

        assert_eq!(value["city"], "Oslo");
        assert_eq!(value["wind_speed"], "15 km/h");
        assert_eq!(value.as_object().expect("is object").len(), 6);
    }
}

#[cfg(test)]
mod bmi_tests {
    use super::*;
    use crate::capabilities::bmi::INVALID_INPUT_MESSAGE;

    fn computed(result: &BmiResult) -> (f64, BmiCategory) {
        match result {
            BmiResult::Computed { bmi, category, .. } => (*bmi, *category),
            BmiResult::Invalid { error } => panic!("unexpected error result: {error}"),
        }
    }

    #[test]
    fn reference_scenario() {
        let result = calculate_bmi(70.0, 1.75);

        assert_eq!(
            result,
            BmiResult::Computed {
                bmi: 22.86,
                category: BmiCategory::NormalWeight,
                weight_kg: 70.0,
                height_m: 1.75,
            }
        );
        assert_eq!(
            serde_json::to_value(&result).expect("result serializes"),
            serde_json::json!({
                "bmi": 22.86,
                "category": "Normal weight",
                "weight_kg": 70.0,
                "height_m": 1.75
            })
        );
    }

    #[test]
    fn non_positive_inputs_produce_error_shape() {
        for (weight, height) in [(-5.0, 1.8), (0.0, 1.8), (70.0, 0.0), (70.0, -1.0), (0.0, 0.0)] {
            let result = calculate_bmi(weight, height);

            assert!(result.is_invalid(), "{weight}/{height} should be invalid");
            assert_eq!(
                serde_json::to_value(&result).expect("result serializes"),
                serde_json::json!({"error": INVALID_INPUT_MESSAGE})
            );
        }
    }

    #[test]
    fn nan_is_rejected() {
        assert!(calculate_bmi(f64::NAN, 1.8).is_invalid());
        assert!(calculate_bmi(70.0, f64::NAN).is_invalid());
    }

    #[test]
    fn category_boundaries() {
        // height 1.0 makes bmi equal to the weight
        assert_eq!(computed(&calculate_bmi(18.49, 1.0)).1, BmiCategory::Underweight);
        assert_eq!(computed(&calculate_bmi(18.5, 1.0)).1, BmiCategory::NormalWeight);
        assert_eq!(computed(&calculate_bmi(24.99, 1.0)).1, BmiCategory::NormalWeight);
        assert_eq!(computed(&calculate_bmi(25.0, 1.0)).1, BmiCategory::Overweight);
        assert_eq!(computed(&calculate_bmi(29.99, 1.0)).1, BmiCategory::Overweight);
        assert_eq!(computed(&calculate_bmi(30.0, 1.0)).1, BmiCategory::Obese);
    }

    #[test]
    fn bmi_is_rounded_to_two_decimals() {
        let cases = [
            (70.0, 1.75, 22.86),
            (55.5, 1.62, 21.15),
            (102.3, 1.91, 28.04),
            (48.0, 1.7, 16.61),
            (24.996, 1.0, 25.0),
        ];

        for (weight, height, expected) in cases {
            let (bmi, _) = computed(&calculate_bmi(weight, height));
            assert_eq!(bmi, expected, "{weight}/{height}");
        }
    }

    #[test]
    fn exact_ties_round_to_even() {
        for (weight, expected) in [(22.125, 22.12), (0.125, 0.12), (0.375, 0.38)] {
            let (bmi, _) = computed(&calculate_bmi(weight, 1.0));
            assert_eq!(bmi, expected, "{weight}");
        }
    }

    #[test]
    fn near_ties_follow_the_stored_value() {
        // 2.675 and 1.115 are stored slightly below the half
        assert_eq!(computed(&calculate_bmi(2.675, 1.0)).0, 2.67);
        assert_eq!(computed(&calculate_bmi(1.115, 1.0)).0, 1.11);
    }

    #[test]
    fn overflowing_bmi_is_rejected() {
        let result = calculate_bmi(1e308, 1e-10);

        assert!(result.is_invalid());
        assert_eq!(
            serde_json::to_value(&result).expect("result serializes"),
            serde_json::json!({"error": INVALID_INPUT_MESSAGE})
        );
        assert!(calculate_bmi(f64::INFINITY, 1.8).is_invalid());
    }

    #[test]
    fn category_display_names() {
        assert_eq!(BmiCategory::Underweight.to_string(), "Underweight");
        assert_eq!(BmiCategory::NormalWeight.to_string(), "Normal weight");
        assert_eq!(BmiCategory::Overweight.to_string(), "Overweight");
        assert_eq!(BmiCategory::Obese.to_string(), "Obese");
    }
}

#[cfg(test)]
mod greeting_tests {
    use super::*;

    #[test]
    fn substitutes_name_verbatim() {
        assert_eq!(
            get_greeting("Alice"),
            "Hello, Alice! Welcome to our Railway-deployed MCP server with HTTP streaming!"
        );
        assert_eq!(
            get_greeting(""),
            "Hello, ! Welcome to our Railway-deployed MCP server with HTTP streaming!"
        );
        assert_eq!(
            get_greeting("{name}"),
            "Hello, {name}! Welcome to our Railway-deployed MCP server with HTTP streaming!"
        );
    }
}

#[cfg(test)]
mod question_tests {
    use super::*;
    use crate::capabilities::question::{style_prefix, styles};

    #[test]
    fn academic_scenario() {
        assert_eq!(
            ask_question("space travel", "academic"),
            "Could you provide detailed information regarding space travel? I'm really interested to learn more!"
        );
    }

    #[test]
    fn every_style_has_its_own_prefix() {
        assert_eq!(style_prefix("friendly"), "Could you please tell me more about");
        assert_eq!(style_prefix("formal"), "I would like to inquire about");
        assert_eq!(style_prefix("casual"), "What's up with");
        assert_eq!(
            style_prefix("academic"),
            "Could you provide detailed information regarding"
        );
        assert_eq!(styles().count(), 4);
    }

    #[test]
    fn unknown_style_falls_back_to_friendly() {
        for style in ["", "FRIENDLY", "pirate", "formal "] {
            assert_eq!(
                ask_question("rust", style),
                ask_question("rust", "friendly")
            );
        }
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[tokio::test]
    async fn registers_every_capability() {
        let config = Config::default();
        let server = build_server(&config.server).expect("server builds");

        let statistics = server.server_statistics().await;
        assert_eq!(statistics.server_info.name, "Railway MCP Server");
        assert_eq!(
            statistics.registered_tools,
            vec!["calculate_bmi".to_string(), "get_weather".to_string()]
        );
        assert_eq!(
            statistics.registered_resource_templates,
            vec!["greeting://{name}".to_string()]
        );
        assert_eq!(statistics.registered_prompts, vec!["ask_question".to_string()]);
        assert!(statistics.capabilities.tools.is_some());
        assert!(statistics.capabilities.resources.is_some());
        assert!(statistics.capabilities.prompts.is_some());
        assert_eq!(
            server.instructions.as_deref(),
            Some("A demo MCP server with HTTP streaming deployed on Railway")
        );
    }
}
