use pagecraft_editor::{render_block, BlockId, SiblingBox, SlotLayout, SlotRef};
use pagecraft_workspace::{
    AutosaveEvent, DraftSource, EditorConfig, EditorSession, MemoryRemoteStore, ReleaseOutcome,
    RemoteStore, StaticFetcher, TemplateCache, DEFAULT_CONFIG_NAME, DEFAULT_TTL,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;

const SECTION: &str = r#"<section class="band"><h2>{heading}</h2><div data-area="content"></div><template data-settings-schema><input name="heading" value="Section"></template></section>"#;
const TEXT: &str = r#"<p>{body}</p><template data-settings-schema><textarea name="body">Lorem</textarea></template>"#;
const IMAGE: &str = r#"<img src="{src}" alt=""><template data-settings-schema><input name="src" value="img/hero.png"></template>"#;

fn write_project(dir: &Path) {
    let templates = dir.join("templates");
    std::fs::create_dir_all(&templates).unwrap();
    std::fs::write(templates.join("section.html"), SECTION).unwrap();
    std::fs::write(templates.join("text.html"), TEXT).unwrap();
    std::fs::write(templates.join("image.html"), IMAGE).unwrap();
    std::fs::create_dir_all(dir.join("public/img")).unwrap();
    std::fs::write(dir.join("public/img/hero.png"), b"png").unwrap();
    std::fs::write(
        dir.join(DEFAULT_CONFIG_NAME),
        r#"{"saveDebounceMs": 3600000, "historyQuiescenceMs": 20}"#,
    )
    .unwrap();
}

fn layout(session: &EditorSession, slot: SlotRef) -> SlotLayout {
    let canvas = session.canvas().lock().unwrap();
    let siblings = canvas
        .slot(&slot)
        .map(|area| {
            area.blocks
                .iter()
                .enumerate()
                .map(|(i, b)| SiblingBox {
                    block_id: b.id,
                    top: i as f64 * 40.0,
                    height: 40.0,
                })
                .collect()
        })
        .unwrap_or_default();
    SlotLayout { slot, siblings }
}

async fn drop_at_end(session: &EditorSession, template: &str, slot: SlotRef) -> BlockId {
    session.begin_palette_drag(template);
    session.hover(&layout(session, slot), f64::MAX);
    match session.release().await.unwrap() {
        ReleaseOutcome::Inserted(id) => id,
        other => panic!("expected an insert, got {:?}", other),
    }
}

async fn build_page(session: &EditorSession) -> BlockId {
    let section = drop_at_end(session, "section", SlotRef::root()).await;
    drop_at_end(session, "text", SlotRef::area(section, "content")).await;
    drop_at_end(session, "image", SlotRef::area(section, "content")).await;
    drop_at_end(session, "text", SlotRef::root()).await;
    section
}

#[tokio::test]
async fn test_schema_survives_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let config = EditorConfig::load(dir.path()).unwrap();
    let remote: Arc<dyn RemoteStore> = Arc::new(MemoryRemoteStore::new());

    let session = EditorSession::from_config(&config, dir.path(), "home", Arc::clone(&remote));
    let section = build_page(&session).await;
    session.update_setting(section, "heading", "Intro").await.unwrap();
    let json = session.schema_json().unwrap();

    let reloaded = EditorSession::from_config(&config, dir.path(), "home", remote);
    reloaded.load_schema_json(&json).await.unwrap();

    assert_eq!(reloaded.schema_json().unwrap(), json);
    assert_eq!(reloaded.render_page(), session.render_page());
    assert!(reloaded.render_page().contains("<h2>Intro</h2>"));
}

#[tokio::test]
async fn test_reload_fetches_each_template_once() {
    let fetcher = Arc::new(StaticFetcher::new().with("section", SECTION).with("text", TEXT));
    let session = EditorSession::new(TemplateCache::new(fetcher.clone(), DEFAULT_TTL));

    let text = r#"{"template":"text","settings":{},"areas":[]}"#;
    let json = format!(
        r#"{{"version":1,"blocks":[{{"template":"section","settings":{{}},"areas":[[{t},{t},{t}]]}},{t},{t}]}}"#,
        t = text
    );
    let report = session.load_schema_json(&json).await.unwrap();

    assert_eq!(report.blocks, 6);
    assert_eq!(fetcher.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_undo_undo_redo_and_branching() {
    let fetcher = Arc::new(StaticFetcher::new().with("text", TEXT));
    let session = EditorSession::new(TemplateCache::new(fetcher, DEFAULT_TTL));
    let settle = || tokio::time::sleep(std::time::Duration::from_millis(250));

    let mut states = Vec::new();
    for _ in 0..3 {
        drop_at_end(&session, "text", SlotRef::root()).await;
        settle().await;
        states.push(session.schema_json().unwrap());
    }

    assert!(session.undo().await);
    assert!(session.undo().await);
    assert_eq!(session.schema_json().unwrap(), states[0]);
    assert!(session.redo().await);
    assert_eq!(session.schema_json().unwrap(), states[1]);

    drop_at_end(&session, "text", SlotRef::root()).await;
    settle().await;
    assert!(!session.can_redo());
    assert!(!session.redo().await);
}

#[tokio::test]
async fn test_rendering_is_stable() {
    let fetcher = Arc::new(StaticFetcher::new().with("section", SECTION).with("text", TEXT));
    let session = EditorSession::new(TemplateCache::new(fetcher, DEFAULT_TTL));
    let section = drop_at_end(&session, "section", SlotRef::root()).await;
    drop_at_end(&session, "text", SlotRef::area(section, "content")).await;

    assert_eq!(session.render_page(), session.render_page());
    let canvas = session.canvas().lock().unwrap();
    let block = canvas.find(section).unwrap();
    assert_eq!(render_block(block), render_block(block));
}

#[tokio::test]
async fn test_restore_prefers_newest_draft() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let config = EditorConfig::load(dir.path()).unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());

    let editing = EditorSession::from_config(&config, dir.path(), "home", remote.clone());
    build_page(&editing).await;
    let unsaved = editing.schema_json().unwrap();
    drop(editing);

    // A fresh session picks the draft up from disk
    let session = EditorSession::from_config(&config, dir.path(), "home", remote.clone());
    let source = session.restore_draft().await.unwrap();

    // Both drafts carry the same timestamp; ties go to the local one
    assert_eq!(source, Some(DraftSource::Local));
    assert_eq!(session.schema_json().unwrap(), unsaved);
    assert!(remote.draft("home").is_none());
}

#[tokio::test]
async fn test_reopen_after_save_ignores_older_draft() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let config = EditorConfig::load(dir.path()).unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());

    let editing = EditorSession::from_config(&config, dir.path(), "home", remote.clone());
    build_page(&editing).await;
    editing.save_now().await.unwrap();
    let saved = editing.schema_json().unwrap();
    drop(editing);

    // A draft file left over from before the save
    std::fs::write(
        config.draft_dir(dir.path()).join("home.draft.json"),
        r#"{"content":"{\"version\":1,\"blocks\":[]}","timestamp":1}"#,
    )
    .unwrap();

    let session = EditorSession::from_config(&config, dir.path(), "home", remote.clone());
    assert_eq!(session.open().await.unwrap(), None);
    assert_eq!(session.schema_json().unwrap(), saved);
    assert!(!config.draft_dir(dir.path()).join("home.draft.json").exists());
    assert!(remote.draft("home").is_none());
}

#[tokio::test]
async fn test_save_warns_about_missing_assets() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let config = EditorConfig::load(dir.path()).unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());
    let session = EditorSession::from_config(&config, dir.path(), "home", remote.clone());
    let mut events = session.autosaver().unwrap().subscribe();

    let image = drop_at_end(&session, "image", SlotRef::root()).await;
    session.update_setting(image, "src", "img/missing.png").await.unwrap();
    session.save_now().await.unwrap();

    match events.recv().await.unwrap() {
        AutosaveEvent::Warning(warnings) => {
            assert_eq!(warnings.len(), 1);
            assert_eq!(warnings[0].url, "img/missing.png");
        }
        other => panic!("expected a warning, got {:?}", other),
    }
    assert!(matches!(events.recv().await.unwrap(), AutosaveEvent::Saved { .. }));
    assert_eq!(remote.save_count(), 1);
    assert_eq!(remote.page("home").unwrap().markup, session.render_page());
}
