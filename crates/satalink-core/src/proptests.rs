use crate::{
    frame_crc, packet_beats, ContInserter, ContRemover, CrcChecker, CrcInserter, LinkCrc,
    Scrambler,
};
use proptest::prelude::*;
use satalink_wire::{PhyWord, Primitive};
use std::collections::VecDeque;

const MAX_FRAME_WORDS: usize = 64;

fn payload_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(any::<u32>(), 1..=MAX_FRAME_WORDS)
}

/// Runs of words as they appear between the link and the PHY: mostly idle primitives, with
/// some data mixed in.
fn word_stream_strategy() -> impl Strategy<Value = Vec<PhyWord>> {
    let word = prop_oneof![
        3 => prop::sample::select(vec![
            Primitive::Sync,
            Primitive::Hold,
            Primitive::HoldA,
            Primitive::Align,
            Primitive::RIp,
        ])
        .prop_map(PhyWord::primitive),
        1 => any::<u32>().prop_map(PhyWord::data),
    ];
    prop::collection::vec((word, 1usize..=6), 1..=12).prop_map(|runs| {
        runs.into_iter()
            .flat_map(|(word, len)| std::iter::repeat(word).take(len))
            .collect()
    })
}

/// Pushes `words` through an inserter and a checker with `stalls` deciding consumer readiness,
/// optionally XORing `mask` into framed dword `index` on the way. Returns (data, eop, error).
fn crc_round_trip(
    words: &[u32],
    flip: Option<(usize, u32)>,
    stalls: &[bool],
) -> Vec<(u32, bool, bool)> {
    let mut queue: VecDeque<_> = packet_beats(words).collect();
    let mut inserter = CrcInserter::new();
    let mut checker = CrcChecker::new();
    let mut framed_index = 0;
    let mut out: Vec<(u32, bool, bool)> = Vec::new();
    let mut tick = 0;
    while out.last().map_or(true, |&(_, eop, _)| !eop) {
        assert!(tick < words.len() * 8 + 64, "pipeline stalled");
        let ready = stalls[tick % stalls.len()] || tick % 4 == 0;
        tick += 1;

        let head = queue.front().copied();
        let mut beat = inserter.source(head);
        if let (Some(b), Some((index, mask))) = (beat.as_mut(), flip) {
            if framed_index == index {
                b.data ^= mask;
            }
        }
        let step = checker.step(beat, ready);
        if inserter.commit(head, step.accepted && beat.is_some()) {
            queue.pop_front();
        }
        if step.accepted && beat.is_some() {
            framed_index += 1;
        }
        out.extend(step.output.map(|b| (b.data, b.eop, b.error)));
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_crc_trailer_verifies(words in payload_strategy()) {
        let mut crc = LinkCrc::new();
        for &w in &words {
            crc.update(w);
        }
        prop_assert_eq!(crc.value(), frame_crc(&words));
        prop_assert!(!crc.is_error(frame_crc(&words)));
    }

    #[test]
    fn prop_crc_round_trip(words in payload_strategy(), stalls in prop::collection::vec(any::<bool>(), 1..8)) {
        let out = crc_round_trip(&words, None, &stalls);
        prop_assert_eq!(out.iter().map(|&(d, _, _)| d).collect::<Vec<_>>(), words);
        prop_assert!(!out.last().unwrap().2);
    }

    #[test]
    fn prop_single_bit_flip_detected(
        words in payload_strategy(),
        index in any::<prop::sample::Index>(),
        bit in 0u32..32,
    ) {
        // Any dword of the framed stream, trailer included.
        let index = index.index(words.len() + 1);
        let out = crc_round_trip(&words, Some((index, 1 << bit)), &[true]);
        prop_assert!(out.last().unwrap().2);
    }

    #[test]
    fn prop_scrambler_is_involution(words in payload_strategy()) {
        let mut tx = Scrambler::new();
        let mut rx = Scrambler::new();
        let restored: Vec<u32> = words.iter().map(|&w| rx.apply(tx.apply(w))).collect();
        prop_assert_eq!(restored, words);
    }

    #[test]
    fn prop_cont_round_trip_lossless(
        stream in word_stream_strategy(),
        producer in prop::collection::vec(any::<bool>(), 1..8),
        consumer in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let mut inserter = ContInserter::new();
        let mut remover = ContRemover::new();
        let mut queue: VecDeque<PhyWord> = stream.iter().copied().collect();
        let mut restored = Vec::new();

        // At least one in four ticks has both sides ready, so this always drains.
        for tick in 0..stream.len() * 8 + 16 {
            let present = producer[tick % producer.len()] || tick % 4 == 0;
            let ready = consumer[tick % consumer.len()] || tick % 4 == 0;
            let input = if present { queue.front().copied() } else { None };
            let step = inserter.step(input, ready);
            if step.consumed {
                queue.pop_front();
            }
            if ready {
                restored.extend(remover.step(step.output));
            }
        }
        prop_assert!(queue.is_empty());
        prop_assert_eq!(restored, stream);
    }
}
