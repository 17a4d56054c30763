/*!
 * Tests for subtitle processing functionality
 */

use anyhow::Result;
use polysub::subtitle_processor::{generate_srt, parse_srt, SubtitleCollection, Unit, UnitState};
use polysub::SubtitleError;

use crate::common;

/// Parsing keeps ids and markers verbatim
#[test]
fn test_parse_srt_with_valid_document_should_keep_ids_and_markers() {
    let units = parse_srt("7\n00:00:01,000 --> 00:00:02,500\nHello\nthere\n\n12\n00:00:03.000 --> 00:00:04.000\nBye\n");

    assert_eq!(units.len(), 2);
    assert_eq!(units[0].id, 7);
    assert_eq!(units[0].start, "00:00:01,000");
    assert_eq!(units[0].end, "00:00:02,500");
    assert_eq!(units[0].source_text, "Hello\nthere");
    assert_eq!(units[1].id, 12);
    assert_eq!(units[1].start, "00:00:03.000");
    assert!(units.iter().all(|u| u.state() == UnitState::Pending));
}

/// Windows line endings and extra blank lines are tolerated
#[test]
fn test_parse_srt_with_crlf_and_extra_blank_lines_should_parse_all_blocks() {
    let content = "1\r\n00:00:01,000 --> 00:00:02,000\r\nOne\r\n\r\n\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nTwo\r\n";
    let units = parse_srt(content);

    assert_eq!(units.len(), 2);
    assert_eq!(units[1].source_text, "Two");
}

/// Malformed blocks are dropped, their neighbours survive
#[test]
fn test_parse_srt_with_malformed_block_should_skip_only_that_block() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\nGood\n\nnot a number\n00:00:03,000 --> 00:00:04,000\nBad\n\n3\nno time here\nAlso bad\n\n4\n00:00:05,000 --> 00:00:06,000\nAlso good\n";
    let units = parse_srt(content);

    assert_eq!(units.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 4]);
}

/// A time line with trailing position data falls back to the tolerant reader
#[test]
fn test_parse_srt_with_decorated_time_line_should_use_fallback() {
    let units = parse_srt("5\n00:00:01,000 --> 00:00:02,000 X1:10 X2:20\nStyled\n");

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].id, 5);
    assert_eq!(units[0].end, "00:00:02,000");
    assert_eq!(units[0].source_text, "Styled");
}

#[test]
fn test_parse_srt_with_empty_input_should_return_nothing() {
    assert!(parse_srt("").is_empty());
    assert!(parse_srt("\n\n\n").is_empty());
}

/// Export uses the translation when present and the source otherwise
#[test]
fn test_generate_srt_with_mixed_units_should_fall_back_to_source() -> Result<()> {
    let mut translated = Unit::new(1, "00:00:01,000", "00:00:02,000", "Hello");
    translated.claim("lane")?;
    translated.complete("  Xin chào  ")?;
    let mut failed = Unit::new(2, "00:00:03,000", "00:00:04,000", "World");
    failed.claim("lane")?;
    failed.fail()?;
    let pending = Unit::new(3, "00:00:05,000", "00:00:06,000", " Untouched ");

    let srt = generate_srt(&[translated, failed, pending]);

    assert_eq!(
        srt,
        "1\n00:00:01,000 --> 00:00:02,000\nXin chào\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n\n3\n00:00:05,000 --> 00:00:06,000\nUntouched\n"
    );
    Ok(())
}

/// Parsing an export yields the same ids, markers and texts
#[test]
fn test_parse_of_generated_document_should_be_stable() {
    let original = parse_srt(&common::sample_srt(12));
    let reparsed = parse_srt(&generate_srt(&original));

    assert_eq!(reparsed.len(), original.len());
    for (a, b) in original.iter().zip(&reparsed) {
        assert_eq!((a.id, &a.start, &a.end, &a.source_text), (b.id, &b.start, &b.end, &b.source_text));
    }
}

/// Translated bodies survive an export and re-parse, even with blank lines inside
#[test]
fn test_parse_of_generated_translations_should_keep_every_unit() -> Result<()> {
    let mut units = parse_srt(&common::sample_srt(3));
    for (unit, translation) in units.iter_mut().zip(["Xin chào\n\nbạn", "Dòng hai\r\n \r\nvà ba", "Tạm biệt"]) {
        unit.claim("lane")?;
        unit.complete(translation)?;
    }

    let reparsed = parse_srt(&generate_srt(&units));

    assert_eq!(reparsed.len(), 3);
    let texts: Vec<&str> = reparsed.iter().map(|u| u.source_text.as_str()).collect();
    assert_eq!(texts, vec!["Xin chào\nbạn", "Dòng hai\nvà ba", "Tạm biệt"]);
    for (a, b) in units.iter().zip(&reparsed) {
        assert_eq!((a.id, &a.start, &a.end), (b.id, &b.start, &b.end));
        assert_eq!(a.export_text(), b.source_text.as_str());
    }
    Ok(())
}

/// Units only move forward through their states
#[test]
fn test_unit_transitions_with_illegal_order_should_be_rejected() -> Result<()> {
    let mut unit = Unit::new(9, "a", "b", "text");

    assert!(matches!(
        unit.complete("early"),
        Err(SubtitleError::InvalidTransition { id: 9, from: UnitState::Pending, to: UnitState::Completed })
    ));
    assert!(unit.fail().is_err());

    unit.claim("Lane A")?;
    assert!(unit.claim("Lane B").is_err());
    assert_eq!(unit.assigned_lane(), Some("Lane A"));

    unit.complete("done")?;
    assert!(unit.fail().is_err());
    assert_eq!(unit.state(), UnitState::Completed);
    assert_eq!(unit.translated_text, "done");
    Ok(())
}

#[test]
fn test_unit_state_display_should_use_status_labels() {
    assert_eq!(UnitState::Pending.to_string(), "pending");
    assert_eq!(UnitState::Claimed.to_string(), "processing");
    assert_eq!(UnitState::Completed.to_string(), "completed");
    assert_eq!(UnitState::Failed.to_string(), "error");
}

/// Files with a byte order mark load like any other
#[test]
fn test_read_from_file_with_bom_should_parse_first_block() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "bom.srt",
        "\u{feff}1\n00:00:01,000 --> 00:00:02,000\nFirst\n",
    )?;

    let collection = SubtitleCollection::read_from_file(&path)?;

    assert_eq!(collection.units.len(), 1);
    assert_eq!(collection.units[0].id, 1);
    assert_eq!(collection.source_file, path);
    Ok(())
}

/// Writing creates missing directories
#[test]
fn test_write_to_srt_with_nested_path_should_create_directories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "source.srt")?;
    let collection = SubtitleCollection::read_from_file(&source)?;

    let target = temp_dir.path().join("out").join("nested").join("copy.srt");
    collection.write_to_srt(&target)?;

    let reloaded = SubtitleCollection::read_from_file(&target)?;
    assert_eq!(reloaded.units.len(), 3);
    assert_eq!(reloaded.units[2].source_text, "For testing purposes.");
    Ok(())
}

#[test]
fn test_read_from_file_with_missing_file_should_fail() {
    assert!(SubtitleCollection::read_from_file("/definitely/not/here.srt").is_err());
}
