use proptest::prelude::*;
use square_sync::domain::{Direction, EntityState, MovementFlags};
use square_sync::interface_adapters::codec::{decode, encode, encoded_len, join_u16, split_u16};
use square_sync::interface_adapters::protocol::Frame;
use square_sync::use_cases::Reconciler;

fn direction() -> impl Strategy<Value = Direction> {
    (0u8..=7).prop_map(|b| Direction::from_wire(b).expect("valid direction byte"))
}

fn flags() -> impl Strategy<Value = MovementFlags> {
    any::<[bool; 4]>().prop_map(|[left, right, down, up]| MovementFlags {
        left,
        right,
        down,
        up,
    })
}

prop_compose! {
    fn entity()(
        identifier in "\\PC{0,100}".prop_filter("fits the length prefix", |id| id.len() <= 255),
        last_update in 0.0f64..4_102_444_800_000.0,
        ints in any::<[u16; 10]>(),
        alpha in 0.0f32..=1.0,
        dir in direction(),
        moves in flags(),
    ) -> EntityState {
        EntityState {
            identifier,
            last_update,
            x: ints[0],
            y: ints[1],
            prev_x: ints[2],
            prev_y: ints[3],
            dest_x: ints[4],
            dest_y: ints[5],
            width: ints[6],
            height: ints[7],
            frame: ints[8],
            frame_count: ints[9],
            alpha,
            direction: dir,
            movement: moves,
        }
    }
}

proptest! {
    #[test]
    fn encode_then_decode_is_identity(state in entity()) {
        let bytes = encode(&state).expect("encodable state");
        prop_assert_eq!(bytes.len(), encoded_len(&state));
        prop_assert_eq!(decode(&bytes).expect("decodable"), state);
    }

    #[test]
    fn two_byte_integers_split_high_then_low(value in any::<u16>()) {
        let [high, low] = split_u16(value);
        prop_assert_eq!(high as u16 * 256 + low as u16, value);
        prop_assert_eq!(join_u16([high, low]), value);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = decode(&bytes);
        let _ = Frame::decode(&bytes);
    }

    #[test]
    fn merging_the_same_update_twice_changes_nothing(
        first in entity(),
        second_update in 1.0f64..1_000.0,
        dest_x in any::<u16>(),
    ) {
        let mut reconciler = Reconciler::default();
        reconciler.merge(first.clone());

        let mut update = first.clone();
        update.last_update = first.last_update + second_update;
        update.dest_x = dest_x;

        reconciler.merge(update.clone());
        let once = reconciler.snapshot();
        reconciler.merge(update);
        prop_assert_eq!(reconciler.snapshot(), once);
    }
}
