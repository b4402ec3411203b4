use chrono::{NaiveDate, NaiveDateTime};
use wrdspc_core::editor::ancestor_chain;
use wrdspc_core::model::inline::Affinity;
use wrdspc_core::{
    dispatch, resolve_active_formats, AncestorTag, Block, DispatchStatus, Document, FormatCommand,
    FormatId, HeadingLevel, InlineStyle, ListKind, Position, Selection, SelectionTracker, TagName,
    TextPath, TextRun,
};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_hms_opt(14, 7, 9)
        .unwrap()
}

fn two_paragraphs() -> Document {
    Document::from_blocks(vec![Block::paragraph("alpha"), Block::paragraph("beta")])
}

fn across_both() -> Selection {
    Selection::new(
        Position::new(TextPath::top(0), 0),
        Position::new(TextPath::top(1), 4),
    )
}

#[test]
fn inline_toggles_applied_twice_restore_the_document() {
    for command in [
        FormatCommand::Bold,
        FormatCommand::Italic,
        FormatCommand::Underline,
        FormatCommand::Strikethrough,
    ] {
        let original = two_paragraphs();
        let mut doc = original.clone();

        let first = dispatch(&mut doc, &across_both(), &command, now()).unwrap();
        assert_eq!(first.status, DispatchStatus::Applied, "{command:?}");
        assert_ne!(doc, original);

        let second = dispatch(&mut doc, &first.selection, &command, now()).unwrap();
        assert_eq!(second.status, DispatchStatus::Removed, "{command:?}");
        assert_eq!(doc, original.normalized(), "{command:?}");
    }
}

#[test]
fn list_toggle_applied_twice_restores_paragraphs() {
    let original = two_paragraphs();
    let mut doc = original.clone();

    let first = dispatch(&mut doc, &across_both(), &FormatCommand::BulletList, now()).unwrap();
    assert_eq!(first.status, DispatchStatus::Applied);
    match &doc.blocks[..] {
        [Block::List(list)] => {
            assert_eq!(list.kind, ListKind::Bullet);
            assert_eq!(list.items.len(), 2);
        }
        other => panic!("unexpected blocks: {other:?}"),
    }

    dispatch(&mut doc, &first.selection, &FormatCommand::BulletList, now()).unwrap();
    assert_eq!(doc, original.normalized());
}

#[test]
fn heading_toggle_on_active_level_reverts_to_paragraph() {
    let mut doc = Document::from_blocks(vec![Block::paragraph("Title")]);
    let caret = Selection::collapsed(Position::new(TextPath::top(0), 2));
    let h2 = FormatCommand::Heading(HeadingLevel::new(2).unwrap());

    let first = dispatch(&mut doc, &caret, &h2, now()).unwrap();
    assert!(matches!(
        &doc.blocks[0],
        Block::Heading { level, .. } if level.get() == 2
    ));
    assert!(first.html.starts_with("<h2>"));

    dispatch(&mut doc, &first.selection, &h2, now()).unwrap();
    assert_eq!(doc.blocks, vec![Block::paragraph("Title")]);
}

#[test]
fn nested_bold_and_italic_both_resolve() {
    let chain = vec![
        AncestorTag::parse("em"),
        AncestorTag::parse("strong"),
        AncestorTag::parse("p"),
        AncestorTag::new(TagName::Root),
    ];

    let active = resolve_active_formats(&chain);

    assert!(active.contains(FormatId::Bold));
    assert!(active.contains(FormatId::Italic));
    assert!(!active.contains(FormatId::Underline));
    assert_eq!(active.heading, None);
}

#[test]
fn nearest_heading_and_list_win_in_malformed_chains() {
    let chain = vec![
        AncestorTag::parse("h2"),
        AncestorTag::parse("h1"),
        AncestorTag::parse("li"),
        AncestorTag::parse("ol"),
        AncestorTag::parse("li"),
        AncestorTag::parse("ul"),
        AncestorTag::new(TagName::Root),
    ];

    let active = resolve_active_formats(&chain);

    assert_eq!(active.heading, HeadingLevel::new(2));
    assert_eq!(active.list, Some(ListKind::Ordered));
}

#[test]
fn ancestor_chain_reflects_run_styles_at_the_caret() {
    let bold = InlineStyle {
        bold: true,
        ..InlineStyle::default()
    };
    let doc = Document::from_blocks(vec![Block::Paragraph(vec![
        TextRun::plain("plain "),
        TextRun::styled("strong", bold),
    ])]);

    let inside = ancestor_chain(&doc, &Position::new(TextPath::top(0), 8), Affinity::Backward)
        .unwrap();
    assert!(resolve_active_formats(&inside).bold);

    let before = ancestor_chain(&doc, &Position::new(TextPath::top(0), 3), Affinity::Backward)
        .unwrap();
    assert!(!resolve_active_formats(&before).bold);
    assert_eq!(before.last(), Some(&AncestorTag::new(TagName::Root)));
}

#[test]
fn tracker_drops_collapsed_caret_without_formats() {
    let doc = two_paragraphs();
    let mut tracker = SelectionTracker::new();

    let caret = Selection::collapsed(Position::new(TextPath::top(0), 1));
    assert!(tracker.update(&doc, Some(caret), None).is_none());

    let stale = Selection::collapsed(Position::new(TextPath::top(7), 0));
    assert!(tracker.update(&doc, Some(stale), None).is_none());
    assert!(tracker.current().is_none());
}

#[test]
fn date_and_time_are_inserted_at_the_caret() {
    let mut doc = Document::from_blocks(vec![Block::paragraph("Today: ")]);
    let caret = Selection::collapsed(Position::new(TextPath::top(0), 7));

    let outcome = dispatch(&mut doc, &caret, &FormatCommand::InsertDate, now()).unwrap();
    assert_eq!(outcome.text, "Today: 3/5/2024");

    let end = Selection::collapsed(Position::new(TextPath::top(0), 15));
    let outcome = dispatch(&mut doc, &end, &FormatCommand::InsertTime, now()).unwrap();
    assert_eq!(outcome.text, "Today: 3/5/20242:07:09 PM");
}

#[test]
fn blank_link_is_cancelled_without_mutation() {
    let original = two_paragraphs();
    let mut doc = original.clone();
    let selection = Selection::within(TextPath::top(0), 0, 5);

    let outcome = dispatch(
        &mut doc,
        &selection,
        &FormatCommand::Link {
            url: "   ".to_string(),
        },
        now(),
    )
    .unwrap();

    assert_eq!(outcome.status, DispatchStatus::Cancelled);
    assert!(!outcome.changed());
    assert_eq!(doc, original);
}

#[test]
fn catalog_ids_parse_to_commands() {
    assert_eq!(FormatCommand::parse("bold", None), Some(FormatCommand::Bold));
    assert_eq!(
        FormatCommand::parse("h3", None),
        Some(FormatCommand::Heading(HeadingLevel::new(3).unwrap()))
    );
    assert_eq!(
        FormatCommand::parse("table", Some("2x4")),
        Some(FormatCommand::Table { rows: 2, cols: 4 })
    );
    assert_eq!(FormatCommand::parse("h9", None), None);
    assert_eq!(FormatCommand::parse("sparkle", None), None);
}
