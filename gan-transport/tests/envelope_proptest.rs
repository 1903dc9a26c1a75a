use gan_transport::AesCbcEnvelope;
use proptest::prelude::*;

proptest! {
    #[test]
    fn encrypt_then_decrypt_is_identity(
        payload in prop::collection::vec(any::<u8>(), 16..64),
    ) {
        let envelope = AesCbcEnvelope::new([0x42; 16], [0x24; 16], &[9, 8, 7, 6, 5, 4]);
        let original = payload.clone();
        let mut buf = original.clone();
        envelope.encrypt(&mut buf).unwrap();
        envelope.decrypt(&mut buf).unwrap();
        prop_assert_eq!(buf, original);
    }
}
