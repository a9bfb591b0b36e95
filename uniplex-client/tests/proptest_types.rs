//! Property tests over the public value types.

use proptest::prelude::*;
use uniplex_client::entities::{Avatar, WorldState};
use uniplex_client::types::{Application, Cell, Location, Vector3};
use uniplex_proto::ReasonCode;

proptest! {
    #[test]
    fn cell_containment_is_consistent_with_flooring(
        x in -10_000.0f64..10_000.0,
        y in -100.0f64..100.0,
        z in -10_000.0f64..10_000.0,
    ) {
        let position = Vector3::new(x, y, z);
        let cell = Cell::containing(position);
        prop_assert!(f64::from(cell.x) <= x && x < f64::from(cell.x) + 1.0);
        prop_assert!(f64::from(cell.z) <= z && z < f64::from(cell.z) + 1.0);
        // Height never affects the bucket.
        prop_assert_eq!(cell, Cell::containing(Vector3::new(x, 0.0, z)));
    }

    #[test]
    fn location_cell_matches_position_cell(
        x in -1_000.0f64..1_000.0,
        z in -1_000.0f64..1_000.0,
    ) {
        let location = Location::new("w", Vector3::new(x, 0.0, z), Default::default());
        prop_assert_eq!(location.cell(), Cell::containing(location.position));
    }

    #[test]
    fn reason_codes_round_trip_through_raw(raw in i32::MIN..i32::MAX) {
        prop_assert_eq!(ReasonCode::from_raw(raw).as_raw(), raw);
    }

    #[test]
    fn unknown_world_states_decode_without_loss_of_the_known_ones(raw in 3i32..1_000) {
        prop_assert_eq!(WorldState::from_raw(raw), WorldState::Unknown);
    }

    #[test]
    fn bot_detection_never_fires_on_unframed_names(name in "[A-Za-z0-9 ]{0,32}") {
        let avatar = Avatar {
            session: 1,
            name,
            location: Location::nowhere(),
            application: Application::default(),
            avatar_type: 0,
            user_id: None,
        };
        prop_assert!(!avatar.is_bot());
    }
}
