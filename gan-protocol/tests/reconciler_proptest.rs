//! Property test for the reconciler-ordering invariant (spec §8): whatever
//! the size of a gap between two live move arrivals, once the missing
//! serials are injected (newest-first, exactly as a real history response
//! delivers them), the reconciler must emit the full run in strictly
//! ascending serial order.

use gan_protocol::event::{Direction, Face, MoveEvent};
use gan_protocol::reconciler::MoveReconciler;
use proptest::prelude::*;

fn mv(serial: u8) -> MoveEvent {
    MoveEvent {
        face: Face::U,
        direction: Direction::Clockwise,
        serial,
        host_ts: Some(0),
        cube_ts: None,
    }
}

fn noop_encoder(_start: u8, _count: u8) -> Vec<u8> {
    Vec::new()
}

proptest! {
    #[test]
    fn gap_of_any_size_and_start_emits_strictly_ascending_serials(
        start in any::<u8>(),
        run_len in 1usize..12,
    ) {
        let mut r = MoveReconciler::new();

        // First live move establishes the baseline serial; a fresh
        // reconciler always accepts it immediately regardless of value.
        let baseline = r.on_move(mv(start), 0, noop_encoder);
        prop_assert_eq!(baseline.emitted.len(), 1);
        prop_assert_eq!(baseline.emitted[0].serial, start);

        // The next live move arrives `run_len` serials later, opening a gap
        // when run_len > 1.
        let far = start.wrapping_add(run_len as u8);
        let after_gap = r.on_move(mv(far), 1, noop_encoder);

        if run_len == 1 {
            prop_assert_eq!(after_gap.emitted.len(), 1);
            prop_assert_eq!(after_gap.emitted[0].serial, far);
            return Ok(());
        }

        prop_assert!(after_gap.emitted.is_empty());
        prop_assert!(!after_gap.outbound.is_empty());

        // History delivers the missing middle serials newest-first.
        for i in (1..run_len).rev() {
            r.inject(mv(start.wrapping_add(i as u8)));
        }
        let recovered = r.evict(noop_encoder);

        let serials: Vec<u8> = recovered.emitted.iter().map(|m| m.serial).collect();
        let expected: Vec<u8> = (1..=run_len as u8).map(|i| start.wrapping_add(i)).collect();
        prop_assert_eq!(serials, expected);
        prop_assert!(!recovered.desynchronized);
    }
}
