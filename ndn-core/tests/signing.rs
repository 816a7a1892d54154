use bytes::Bytes;
use ndn_core::algorithms::{
    DigestSigning, Ed25519Signer, HmacKey, KeyGenerator, RsaSigner, RsaVerifier,
};
use ndn_core::packets::tlv_types;
use ndn_core::{
    sign_packet, verify_packet, ContentType, Data, Encodable, Encoder, ErrorKind, Interest,
    KeyLocator, Name, PacketError, SignatureError, SignatureInfo, SignatureType, Signer, TlvError,
    ValidityPeriod, Verifiable, Verifier,
};
use sha2::{Digest, Sha256};

fn data(uri: &str, content: &[u8]) -> Data {
    Data::new(Name::from_uri(uri).unwrap(), content.to_vec())
}

/// Sign, verify, then flip a content byte and expect rejection
async fn sign_verify_tamper<S, V>(signer: &S, verifier: &V)
where
    S: Signer,
    V: Verifier,
{
    let mut packet = data("/A/B", b"hello world");
    sign_packet(&mut packet, signer).await.unwrap();
    assert_eq!(
        packet.sig_info.as_ref().unwrap().sig_type,
        signer.signature_type()
    );

    let decoded = Data::decode(Encoder::encode(&packet).unwrap()).unwrap();
    verify_packet(&decoded, verifier).await.unwrap();

    let mut content = packet.content_bytes().to_vec();
    content[0] ^= 0x01;
    packet.content = Some(Bytes::from(content.clone()));
    let err = verify_packet(&packet, verifier).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Signature);
    assert!(matches!(
        err,
        PacketError::Signature(SignatureError::VerificationFailed)
    ));

    let mut tampered = decoded.clone();
    tampered.content = Some(Bytes::from(content));
    assert!(verify_packet(&tampered, verifier).await.is_err());
}

#[tokio::test]
async fn data_digest_sha256() {
    sign_verify_tamper(&DigestSigning, &DigestSigning).await;
}

#[tokio::test]
async fn data_hmac() {
    let key = HmacKey::new(b"0123456789abcdef");
    sign_verify_tamper(&key, &key).await;
}

#[tokio::test]
async fn data_ed25519() {
    let signer = Ed25519Signer::generate();
    sign_verify_tamper(&signer, &signer.verifier()).await;
}

#[tokio::test]
async fn data_rsa() {
    let private_key = KeyGenerator::generate_rsa_keypair(1024).unwrap();
    let public_key = KeyGenerator::extract_public_key(&private_key);
    let locator = KeyGenerator::key_locator_name(&public_key).unwrap();

    let signer = RsaSigner::new(private_key).with_key_locator(KeyLocator::Name(locator.clone()));
    sign_verify_tamper(&signer, &RsaVerifier::new(public_key)).await;

    let mut packet = data("/A", b"x");
    sign_packet(&mut packet, &signer).await.unwrap();
    assert_eq!(
        packet.sig_info().unwrap().key_locator,
        Some(KeyLocator::Name(locator))
    );
}

#[tokio::test]
async fn signed_interest_roundtrip() {
    let signer = Ed25519Signer::generate();
    let mut interest = Interest::new(Name::from_uri("/cmd/reboot").unwrap())
        .with_sig_info(
            SignatureInfo::new(SignatureType::Null)
                .with_nonce(vec![0x01, 0x02, 0x03, 0x04])
                .with_time(1_700_000_000_000),
        );
    sign_packet(&mut interest, &signer).await.unwrap();

    // SignatureNonce and SignatureTime survive sign_packet
    let info = interest.sig_info.as_ref().unwrap();
    assert_eq!(info.sig_type, SignatureType::Ed25519);
    assert_eq!(info.time, Some(1_700_000_000_000));

    let decoded = Interest::decode(Encoder::encode(&interest).unwrap()).unwrap();
    assert_eq!(decoded.name.len(), 3);
    decoded.validate_params_digest().unwrap();
    verify_packet(&decoded, &signer.verifier()).await.unwrap();

    let stranger = Ed25519Signer::generate().verifier();
    assert!(verify_packet(&decoded, &stranger).await.is_err());
}

#[tokio::test]
async fn signed_interest_parameters_bound() {
    let key = HmacKey::new(b"secret");
    let mut interest =
        Interest::new(Name::from_uri("/set").unwrap()).with_app_parameters(vec![0x01]);
    sign_packet(&mut interest, &key).await.unwrap();
    verify_packet(&interest, &key).await.unwrap();

    interest.app_parameters = Some(Bytes::from_static(&[0x02]));
    let err = verify_packet(&interest, &key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncorrectDigest);
}

#[tokio::test]
async fn verify_unsigned_data_rejected() {
    let packet = data("/A", b"x");
    let err = verify_packet(&packet, &DigestSigning).await.unwrap_err();
    assert!(matches!(err, PacketError::MissingSignatureInfo));
}

#[tokio::test]
async fn signer_failure_propagates() {
    struct Failing;

    #[async_trait::async_trait]
    impl Signer for Failing {
        fn signature_type(&self) -> SignatureType {
            SignatureType::Sha256WithEcdsa
        }

        async fn sign(&self, _input: &[u8]) -> Result<Vec<u8>, SignatureError> {
            Err(SignatureError::UnsupportedSignatureType(self.signature_type()))
        }
    }

    let mut packet = data("/A", b"x");
    let err = sign_packet(&mut packet, &Failing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Signature);
    assert!(packet.sig_value.is_none());
}

#[tokio::test]
async fn data_from_another_encoder_verifies() {
    // empty Content element, which a locally built Data omits by default
    let signed: &[u8] = &[
        0x07, 0x03, 0x08, 0x01, 0x41, 0x15, 0x00, 0x16, 0x03, 0x1B, 0x01, 0x00,
    ];
    let mut value = signed.to_vec();
    value.extend_from_slice(&[0x17, 0x20]);
    value.extend_from_slice(&Sha256::digest(signed));
    let mut encoder = Encoder::new();
    encoder.put_tlv(tlv_types::DATA, &value);
    let wire = encoder.finish();

    let decoded = Data::decode(wire.clone()).unwrap();
    assert_eq!(decoded.content, Some(Bytes::new()));
    verify_packet(&decoded, &DigestSigning).await.unwrap();
    assert_eq!(Encoder::encode(&decoded).unwrap(), wire);
    assert_eq!(
        decoded.compute_implicit_digest().unwrap(),
        <[u8; 32]>::from(Sha256::digest(&wire))
    );
}

#[tokio::test]
async fn certificate_with_validity_period_verifies() {
    let signer = Ed25519Signer::generate();

    let mut signed = Encoder::new();
    Name::from_uri("/A/KEY/k1/self/v1")
        .unwrap()
        .encode_to(&mut signed)
        .unwrap();
    signed.put_tlv(tlv_types::META_INFO, &[0x18, 0x01, 0x02]);
    signed.put_tlv(tlv_types::CONTENT, &[0xAB, 0xCD]);
    signed
        .put_nested(tlv_types::DATA_SIGNATURE_INFO, |e| {
            e.put_nni(tlv_types::SIGNATURE_TYPE, 5);
            e.put_nested(tlv_types::VALIDITY_PERIOD, |e| {
                e.put_tlv(tlv_types::NOT_BEFORE, b"20200101T000000");
                e.put_tlv(tlv_types::NOT_AFTER, b"20401231T235959");
                Ok::<(), TlvError>(())
            })?;
            // unknown non-critical extension
            e.put_tlv(0xF0, &[0x01]);
            Ok::<(), TlvError>(())
        })
        .unwrap();
    let signed = signed.finish();
    let sig_value = signer.sign(&signed).await.unwrap();

    let mut encoder = Encoder::new();
    encoder.put_tlv(
        tlv_types::DATA,
        &[&signed[..], &[0x17, 0x40][..], &sig_value[..]].concat(),
    );
    let cert = Data::decode(encoder.finish()).unwrap();

    assert_eq!(cert.content_type, ContentType::KEY);
    let info = cert.sig_info.as_ref().unwrap();
    assert_eq!(info.sig_type, SignatureType::Ed25519);
    assert_eq!(
        info.validity,
        Some(ValidityPeriod::new("20200101T000000", "20401231T235959"))
    );
    verify_packet(&cert, &signer.verifier()).await.unwrap();
}
