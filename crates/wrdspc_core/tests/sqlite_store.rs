use wrdspc_core::db::open_db;
use wrdspc_core::{
    CoreConfig, FormatCommand, KeyValueStore, ManualClock, Notebook, Selection, SqliteKvStore,
    TextPath, Theme,
};

#[test]
fn sqlite_store_upserts_and_removes_keys() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wrdspc.db")).unwrap();
    let store = SqliteKvStore::try_new(&conn).unwrap();

    assert_eq!(store.get("wrdspc:theme").unwrap(), None);
    store.set("wrdspc:theme", "dark").unwrap();
    store.set("wrdspc:theme", "light").unwrap();
    assert_eq!(store.get("wrdspc:theme").unwrap().as_deref(), Some("light"));

    store.remove("wrdspc:theme").unwrap();
    store.remove("wrdspc:theme").unwrap();
    assert_eq!(store.get("wrdspc:theme").unwrap(), None);
}

#[test]
fn notebook_state_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wrdspc.db");
    let clock = ManualClock::new(5_000);
    let config = CoreConfig::default();

    let page_id = {
        let conn = open_db(&path).unwrap();
        let store = SqliteKvStore::try_new(&conn).unwrap();
        let mut notebook = Notebook::open(store, clock.clone(), &config).unwrap();
        notebook.set_theme(Theme::Light).unwrap();

        let page = notebook.create_page("Journal", Some("📓")).unwrap();
        let mut session = notebook.open_page(&page.id).unwrap();
        notebook
            .replace_content(&mut session, "<p>dear diary</p>")
            .unwrap();
        session.select(Selection::within(TextPath::top(0), 5, 10), None);
        notebook
            .apply(&mut session, &FormatCommand::Italic)
            .unwrap();
        notebook.close_page(session).unwrap();
        page.id
    };

    let conn = open_db(&path).unwrap();
    let store = SqliteKvStore::try_new(&conn).unwrap();
    let notebook = Notebook::open(store, clock, &config).unwrap();

    assert_eq!(notebook.theme(), Theme::Light);
    let page = notebook.get_page(&page_id).unwrap();
    assert_eq!(page.title, "Journal");
    assert_eq!(page.emoji, "📓");
    assert_eq!(page.content, "<p>dear <em>diary</em></p>");
}

#[test]
fn namespaces_do_not_share_pages() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wrdspc.db")).unwrap();
    let store = SqliteKvStore::try_new(&conn).unwrap();
    let clock = ManualClock::new(0);

    let work = CoreConfig {
        namespace: "work".to_string(),
        ..CoreConfig::default()
    };
    let first = Notebook::open(store, clock.clone(), &work).unwrap();
    first.create_page("Standup", None).unwrap();

    let second = Notebook::open(store, clock, &CoreConfig::default()).unwrap();
    assert!(second.list_pages().unwrap().is_empty());
    assert_eq!(first.list_pages().unwrap().len(), 1);
    assert!(store.get("work:pages").unwrap().is_some());
}
