//! End-to-end scenarios exercised against the public API only, from outside
//! the crate rather than from a `#[cfg(test)]` module.

use iamf_core::{Decoder, IamfError, Layout, OutputSampleType, RequestedMix, Settings, SoundSystem};

fn uleb(mut v: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if v == 0 {
            break;
        }
    }
    out
}

fn obu(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![tag << 3];
    out.extend(uleb(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

fn sequence_header(profile: u8) -> Vec<u8> {
    obu(0, &[profile])
}

fn codec_config(id: u32, codec_kind: u8, sample_rate: u32, frame_size: u32, bit_depth: u8) -> Vec<u8> {
    let mut payload = uleb(id as u64);
    payload.push(codec_kind);
    payload.extend_from_slice(&sample_rate.to_be_bytes());
    payload.extend(uleb(frame_size as u64));
    payload.push(bit_depth);
    payload.extend(uleb(0)); // codec_private_len = 0
    obu(1, &payload)
}

fn audio_element_channels(id: u32, codec_config_id: u32, system_tag: u8, substreams: &[u32]) -> Vec<u8> {
    let mut payload = uleb(id as u64);
    payload.extend(uleb(codec_config_id as u64));
    payload.push(0); // Channels tag
    payload.push(system_tag);
    payload.extend(uleb(substreams.len() as u64));
    for &s in substreams {
        payload.extend(uleb(s as u64));
    }
    obu(2, &payload)
}

fn mix_presentation(id: u32, profile: u8, audio_element_ids: &[u32], layout_tags: &[u8]) -> Vec<u8> {
    let mut payload = uleb(id as u64);
    payload.push(profile);
    payload.extend(uleb(audio_element_ids.len() as u64));
    for &a in audio_element_ids {
        payload.extend(uleb(a as u64));
    }
    payload.extend(uleb(layout_tags.len() as u64));
    for &tag in layout_tags {
        payload.push(tag);
        payload.extend_from_slice(&0i32.to_be_bytes());
    }
    obu(3, &payload)
}

fn temporal_delimiter() -> Vec<u8> {
    obu(5, &[])
}

fn audio_frame_implicit(substream_id: u8, samples: &[u8]) -> Vec<u8> {
    obu(7 + substream_id, samples)
}

/// One stereo LPCM audio element (substreams 0/1) at 48kHz, 8
/// samples-per-frame, 16-bit; one mix presentation (id 3) with a stereo
/// layout, extended to two substreams so a full stereo frame can be
/// rendered without relying on the (explicitly out-of-scope) ambisonics
/// decode coefficients.
fn basic_descriptor_blob() -> Vec<u8> {
    let mut out = sequence_header(1); // Base profile
    out.extend(codec_config(7, 0, 48_000, 8, 16));
    out.extend(audio_element_channels(4, 7, 0 /* SoundSystem::A */, &[0, 1]));
    out.extend(mix_presentation(3, 1, &[4], &[0]));
    out
}

/// S1: a fresh streaming decoder fed the header and size of an OBU whose
/// payload hasn't fully arrived yet reports no progress and no frames,
/// without erroring.
#[test]
fn s1_descriptor_only_probe_reports_insufficient_data_as_ok() {
    let mut decoder = Decoder::create(Settings::default());
    // IA sequence header OBU (tag 0, no flags) claiming a 5-byte payload,
    // with only one payload byte actually buffered.
    decoder.decode(&[0x00, 0x05, 0x01]).unwrap();
    assert!(!decoder.is_descriptor_processing_complete());
    assert!(!decoder.is_temporal_unit_available());
}

/// S2: a truncated descriptor blob is rejected by the exhaustive entry
/// point.
#[test]
fn s2_truncated_descriptors_are_invalid() {
    let mut blob = basic_descriptor_blob();
    blob.pop();
    let err = Decoder::create_from_descriptors(&blob, Settings::default()).unwrap_err();
    assert!(matches!(err, IamfError::InvalidDescriptors(_)));
}

/// S3: descriptors followed by a bare temporal delimiter seal the
/// descriptor set and produce zero frames.
#[test]
fn s3_descriptors_plus_trailing_temporal_delimiter_seal_with_no_frames() {
    let mut blob = basic_descriptor_blob();
    blob.extend(temporal_delimiter());

    let mut decoder = Decoder::create(Settings::default());
    decoder.decode(&blob).unwrap();
    assert!(decoder.is_descriptor_processing_complete());
    assert!(!decoder.is_temporal_unit_available());
}

/// S4: requesting a layout absent from the descriptor set's only mix
/// presentation falls back to stereo (`SoundSystem::A`).
#[test]
fn s4_unsupported_requested_layout_falls_back_to_stereo() {
    let settings = Settings {
        requested_mix: RequestedMix {
            layout: Some(Layout::SoundSystem(SoundSystem::E)),
            ..Default::default()
        },
        ..Default::default()
    };
    let mut decoder = Decoder::create(settings);
    decoder.decode(&basic_descriptor_blob()).unwrap();
    assert_eq!(decoder.get_output_layout().unwrap(), SoundSystem::A);
}

/// S5: one LPCM stereo temporal unit produces exactly the expected byte
/// count for both supported output sample widths, first requiring a
/// descriptor-only `decode` call before any frame becomes available.
#[test]
fn s5_one_lpcm_temporal_unit_serialises_to_the_expected_byte_count() {
    let samples: [i16; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
    let mut left_bytes = Vec::new();
    let mut right_bytes = Vec::new();
    for &s in &samples {
        left_bytes.extend_from_slice(&s.to_le_bytes());
        right_bytes.extend_from_slice(&(s * 2).to_le_bytes());
    }

    for (sample_type, expected_len) in
        [(OutputSampleType::Int32LittleEndian, 64usize), (OutputSampleType::Int16LittleEndian, 32usize)]
    {
        let settings = Settings { output_sample_type: sample_type, ..Default::default() };
        let mut decoder = Decoder::create(settings);

        decoder.decode(&basic_descriptor_blob()).unwrap();
        assert!(decoder.is_descriptor_processing_complete());
        // First decode call seals descriptors only; it must not also have
        // pulled a temporal unit even though one follows immediately.
        assert!(!decoder.is_temporal_unit_available());

        decoder.decode(&audio_frame_implicit(0, &left_bytes)).unwrap();
        assert!(!decoder.is_temporal_unit_available());
        decoder.decode(&audio_frame_implicit(1, &right_bytes)).unwrap();
        assert!(decoder.is_temporal_unit_available());

        let mut out = vec![0u8; expected_len];
        let n = decoder.get_output_temporal_unit(&mut out).unwrap();
        assert_eq!(n, expected_len);
    }
}

/// S6: for the same LPCM stereo temporal unit as S5, the decoded PCM is
/// pinned to the exact interleaved little-endian integers the serialisation
/// formula (`round(clamp(s, -1, 1) * (2^(N-1) - 1))`) produces, for both
/// supported output widths. This is a numeric regression on the whole
/// pipeline (LPCM dequantisation, channel-matching render, serialisation),
/// not just a byte-count check.
#[test]
fn s6_lpcm_temporal_unit_decodes_to_pinned_pcm_values() {
    let left_samples: [i16; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
    let right_samples: [i16; 8] = [2, 4, 6, 8, 10, 12, 14, 16];
    let mut left_bytes = Vec::new();
    let mut right_bytes = Vec::new();
    for (&l, &r) in left_samples.iter().zip(right_samples.iter()) {
        left_bytes.extend_from_slice(&l.to_le_bytes());
        right_bytes.extend_from_slice(&r.to_le_bytes());
    }

    // round(clamp(v / 32767, -1, 1) * (2^(N-1) - 1)) for each input i16 `v`.
    let expected_int32: [(i32, i32); 8] = [
        (65538, 131076),
        (131076, 262152),
        (196614, 393228),
        (262152, 524304),
        (327690, 655380),
        (393228, 786456),
        (458766, 917532),
        (524304, 1048608),
    ];
    let expected_int16: [(i16, i16); 8] =
        [(1, 2), (2, 4), (3, 6), (4, 8), (5, 10), (6, 12), (7, 14), (8, 16)];

    let settings =
        Settings { output_sample_type: OutputSampleType::Int32LittleEndian, ..Default::default() };
    let mut decoder = Decoder::create(settings);
    decoder.decode(&basic_descriptor_blob()).unwrap();
    decoder.decode(&audio_frame_implicit(0, &left_bytes)).unwrap();
    decoder.decode(&audio_frame_implicit(1, &right_bytes)).unwrap();
    assert!(decoder.is_temporal_unit_available());

    let mut out = vec![0u8; 64];
    let n = decoder.get_output_temporal_unit(&mut out).unwrap();
    assert_eq!(n, 64);
    let mut offset = 0;
    for &(l, r) in &expected_int32 {
        assert_eq!(i32::from_le_bytes(out[offset..offset + 4].try_into().unwrap()), l);
        assert_eq!(i32::from_le_bytes(out[offset + 4..offset + 8].try_into().unwrap()), r);
        offset += 8;
    }

    let settings =
        Settings { output_sample_type: OutputSampleType::Int16LittleEndian, ..Default::default() };
    let mut decoder = Decoder::create(settings);
    decoder.decode(&basic_descriptor_blob()).unwrap();
    decoder.decode(&audio_frame_implicit(0, &left_bytes)).unwrap();
    decoder.decode(&audio_frame_implicit(1, &right_bytes)).unwrap();
    assert!(decoder.is_temporal_unit_available());

    let mut out = vec![0u8; 32];
    let n = decoder.get_output_temporal_unit(&mut out).unwrap();
    assert_eq!(n, 32);
    let mut offset = 0;
    for &(l, r) in &expected_int16 {
        assert_eq!(i16::from_le_bytes(out[offset..offset + 2].try_into().unwrap()), l);
        assert_eq!(i16::from_le_bytes(out[offset + 2..offset + 4].try_into().unwrap()), r);
        offset += 4;
    }
}

/// Chunk-independence: feeding a valid stream in one piece or split across
/// arbitrary byte boundaries yields the same sequence of decoded PCM
/// frames.
#[test]
fn chunk_independence_of_descriptor_and_temporal_unit_parsing() {
    let samples: [i16; 8] = [100, -100, 200, -200, 300, -300, 400, -400];
    let mut left_bytes = Vec::new();
    let mut right_bytes = Vec::new();
    for &s in &samples {
        left_bytes.extend_from_slice(&s.to_le_bytes());
        right_bytes.extend_from_slice(&(-s).to_le_bytes());
    }

    let mut whole = basic_descriptor_blob();
    whole.extend(audio_frame_implicit(0, &left_bytes));
    whole.extend(audio_frame_implicit(1, &right_bytes));

    let decode_in_one_piece = |bytes: &[u8]| -> Vec<u8> {
        let mut decoder = Decoder::create(Settings::default());
        decoder.decode(bytes).unwrap();
        while !decoder.is_temporal_unit_available() && decoder.is_descriptor_processing_complete() {
            decoder.decode(&[]).unwrap();
            break;
        }
        let mut out = vec![0u8; 64];
        if decoder.is_temporal_unit_available() {
            let n = decoder.get_output_temporal_unit(&mut out).unwrap();
            out.truncate(n);
            out
        } else {
            Vec::new()
        }
    };

    let baseline = decode_in_one_piece(&whole);
    assert!(!baseline.is_empty());

    // Feed one byte at a time instead and confirm the same frame results.
    let mut decoder = Decoder::create(Settings::default());
    for chunk in whole.chunks(1) {
        decoder.decode(chunk).unwrap();
    }
    assert!(decoder.is_temporal_unit_available());
    let mut out = vec![0u8; 64];
    let n = decoder.get_output_temporal_unit(&mut out).unwrap();
    out.truncate(n);
    assert_eq!(out, baseline);
}

/// `create_from_descriptors(D)` then `decode(T)` matches
/// `create(); decode(D ++ T)` for a descriptor blob `D` and a temporal-unit
/// tail `T`.
#[test]
fn descriptor_mode_matches_streaming_mode_for_the_same_bytes() {
    let samples: [i16; 8] = [11, 22, 33, 44, 55, 66, 77, 88];
    let mut left_bytes = Vec::new();
    let mut right_bytes = Vec::new();
    for &s in &samples {
        left_bytes.extend_from_slice(&s.to_le_bytes());
        right_bytes.extend_from_slice(&(-s).to_le_bytes());
    }
    let mut tail = Vec::new();
    tail.extend(audio_frame_implicit(0, &left_bytes));
    tail.extend(audio_frame_implicit(1, &right_bytes));

    let descriptors = basic_descriptor_blob();

    let mut streaming = Decoder::create(Settings::default());
    let mut whole = descriptors.clone();
    whole.extend(tail.clone());
    streaming.decode(&whole).unwrap();
    streaming.decode(&[]).unwrap();
    assert!(streaming.is_temporal_unit_available());
    let mut streaming_out = vec![0u8; 64];
    let n1 = streaming.get_output_temporal_unit(&mut streaming_out).unwrap();
    streaming_out.truncate(n1);

    let mut from_descriptors = Decoder::create_from_descriptors(&descriptors, Settings::default()).unwrap();
    from_descriptors.decode(&tail).unwrap();
    assert!(from_descriptors.is_temporal_unit_available());
    let mut descriptor_out = vec![0u8; 64];
    let n2 = from_descriptors.get_output_temporal_unit(&mut descriptor_out).unwrap();
    descriptor_out.truncate(n2);

    assert_eq!(streaming_out, descriptor_out);
}
