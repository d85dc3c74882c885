use std::collections::VecDeque;
use std::{fs, path::PathBuf};

use satalink_core::{
    frame_crc, packet_beats, CrcInserter, Scrambler, CRC_INIT, CRC_POLYNOMIAL, SCRAMBLER_SEED,
};
use serde_json::Value;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn load_vectors() -> Value {
    let path = repo_root().join("protocol-vectors/sata-link-v1.json");
    let raw = fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {path:?}: {err}"));
    serde_json::from_str(&raw).unwrap_or_else(|err| panic!("parse {path:?}: {err}"))
}

fn parse_hex_u32(v: &Value, ctx: &str) -> u32 {
    let s = v
        .as_str()
        .unwrap_or_else(|| panic!("{ctx}: expected hex string, got {v}"));
    let digits = s
        .strip_prefix("0x")
        .unwrap_or_else(|| panic!("{ctx}: missing 0x prefix in {s:?}"));
    u32::from_str_radix(digits, 16).unwrap_or_else(|err| panic!("{ctx}: {s:?}: {err}"))
}

fn parse_words(v: &Value, ctx: &str) -> Vec<u32> {
    v.as_array()
        .unwrap_or_else(|| panic!("{ctx}: expected array"))
        .iter()
        .enumerate()
        .map(|(i, w)| parse_hex_u32(w, &format!("{ctx}[{i}]")))
        .collect()
}

#[test]
fn crc_vectors() {
    let vectors = load_vectors();
    let crc = &vectors["crc"];
    assert_eq!(parse_hex_u32(&crc["polynomial"], "polynomial"), CRC_POLYNOMIAL);
    assert_eq!(parse_hex_u32(&crc["init"], "init"), CRC_INIT);

    let packets = crc["packets"].as_array().expect("packets must be an array");
    assert!(!packets.is_empty());
    for (i, packet) in packets.iter().enumerate() {
        let ctx = format!("packet {i}");
        let words = parse_words(&packet["words"], &ctx);
        let expected = parse_hex_u32(&packet["crc"], &ctx);
        assert_eq!(frame_crc(&words), expected, "{ctx}");
    }
}

#[test]
fn scrambler_vectors() {
    let vectors = load_vectors();
    let scrambler = &vectors["scrambler"];
    assert_eq!(
        parse_hex_u32(&scrambler["seed"], "seed"),
        u32::from(SCRAMBLER_SEED)
    );

    let expected = parse_words(&scrambler["sequence"], "sequence");
    let mut s = Scrambler::new();
    let actual: Vec<u32> = expected
        .iter()
        .map(|_| {
            let v = s.value();
            s.advance();
            v
        })
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn frame_vectors() {
    let vectors = load_vectors();
    let frames = vectors["frames"].as_array().expect("frames must be an array");
    for (i, frame) in frames.iter().enumerate() {
        let ctx = format!("frame {i}");
        let payload = parse_words(&frame["payload"], &ctx);
        let expected = parse_words(&frame["wire"], &ctx);

        // CRC append followed by scrambling, as on the transmit path.
        let mut queue: VecDeque<_> = packet_beats(&payload).collect();
        let mut inserter = CrcInserter::new();
        let mut scrambler = Scrambler::new();
        let mut wire = Vec::new();
        for _ in 0..payload.len() * 2 + 4 {
            let head = queue.front().copied();
            if let Some(beat) = inserter.source(head) {
                wire.push(scrambler.apply(beat.data));
            }
            if inserter.commit(head, true) {
                queue.pop_front();
            }
        }
        assert_eq!(wire, expected, "{ctx}");
    }
}
