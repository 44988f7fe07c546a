//! # Editor session
//!
//! One editing session over one page: the canvas, its history, the
//! template cache, the block state store, the drag gesture in progress
//! and, optionally, the autosaver.
//!
//! Canvas mutations are applied synchronously under the canvas lock.
//! Every edit that lands is handed to the autosaver afterwards.

use crate::autosave::{AutosaveOptions, Autosaver, DraftSource};
use crate::cache::TemplateCache;
use crate::config::EditorConfig;
use crate::deserializer::{DeserializeReport, Deserializer, MissingTemplatePolicy};
use crate::drafts::{FileDraftStore, PageContent, RemoteStore};
use crate::errors::SessionError;
use crate::fetcher::DirectoryFetcher;
use crate::insertion::{complete_insertion, InsertionOutcome};
use crate::lock;
use crate::reachability::AssetChecker;
use crate::recorder::{HistoryRecorder, DEFAULT_QUIESCENCE};
use pagecraft_editor::{
    render_canvas, serialize, BlockId, BlockStateStore, Canvas, DragController, DropIntent,
    DropTarget, Mutation, MutationError, PageSchema, SchemaError, Settings, SlotLayout,
    DEFAULT_MAX_LEVELS,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub history_max_levels: usize,
    pub history_quiescence: Duration,
    pub missing_template: MissingTemplatePolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            history_max_levels: DEFAULT_MAX_LEVELS,
            history_quiescence: DEFAULT_QUIESCENCE,
            missing_template: MissingTemplatePolicy::default(),
        }
    }
}

/// What releasing the pointer did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// No drag in progress, or the pointer was not over a slot
    Nothing,
    Moved(BlockId),
    Inserted(BlockId),
    /// The palette drop's slot disappeared while its template loaded
    Discarded,
}

pub struct EditorSession {
    canvas: Arc<Mutex<Canvas>>,
    recorder: HistoryRecorder,
    cache: TemplateCache,
    deserializer: Deserializer,
    state: BlockStateStore,
    drag: Mutex<DragController>,
    autosaver: Option<Autosaver>,
}

impl EditorSession {
    /// Start an empty session. Must be called inside a tokio runtime.
    pub fn new(cache: TemplateCache) -> Self {
        Self::with_options(cache, SessionOptions::default())
    }

    pub fn with_options(cache: TemplateCache, options: SessionOptions) -> Self {
        let canvas = Arc::new(Mutex::new(Canvas::new()));
        let recorder = HistoryRecorder::spawn(
            Arc::clone(&canvas),
            options.history_max_levels,
            options.history_quiescence,
        );
        let deserializer = Deserializer::with_policy(cache.clone(), options.missing_template);

        Self {
            canvas,
            recorder,
            cache,
            deserializer,
            state: BlockStateStore::new(),
            drag: Mutex::new(DragController::new()),
            autosaver: None,
        }
    }

    /// Session for `page_id` wired up from a config file's settings:
    /// templates from a directory, local drafts as files, links checked
    /// against the asset root.
    pub fn from_config(
        config: &EditorConfig,
        cwd: impl AsRef<Path>,
        page_id: impl Into<String>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        let cwd = cwd.as_ref();
        let fetcher = Arc::new(DirectoryFetcher::new(config.template_dir(cwd)));
        let cache = TemplateCache::new(fetcher, config.template_ttl());

        let options = SessionOptions {
            history_max_levels: config.history_max_levels,
            history_quiescence: config.history_quiescence(),
            missing_template: config.missing_template,
        };
        let autosave_options = AutosaveOptions {
            debounce: config.save_debounce(),
            check_links: config.check_links,
        };
        let local = Arc::new(FileDraftStore::new(config.draft_dir(cwd)));
        let autosaver = Autosaver::new(page_id, local, remote, autosave_options)
            .with_checker(Arc::new(AssetChecker::new(config.asset_root(cwd))));

        Self::with_options(cache, options).with_autosaver(autosaver)
    }

    pub fn with_autosaver(mut self, autosaver: Autosaver) -> Self {
        self.autosaver = Some(autosaver);
        self
    }

    pub fn canvas(&self) -> &Arc<Mutex<Canvas>> {
        &self.canvas
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    pub fn state(&self) -> &BlockStateStore {
        &self.state
    }

    pub fn recorder(&self) -> &HistoryRecorder {
        &self.recorder
    }

    pub fn autosaver(&self) -> Option<&Autosaver> {
        self.autosaver.as_ref()
    }

    // ----- drag & drop -----

    pub fn begin_palette_drag(&self, template_ref: impl Into<String>) {
        lock(&self.drag).begin_palette(template_ref);
    }

    pub fn begin_move_drag(&self, block_id: BlockId) {
        lock(&self.drag).begin_move(block_id);
    }

    /// Pointer moved over `layout`; returns the insertion point it implies
    pub fn hover(&self, layout: &SlotLayout, pointer_y: f64) -> Option<DropTarget> {
        lock(&self.drag).hover(layout, pointer_y).cloned()
    }

    pub fn leave(&self) {
        lock(&self.drag).leave();
    }

    pub fn cancel_drag(&self) {
        lock(&self.drag).cancel();
    }

    /// Drop whatever is being dragged at the last hovered position
    pub async fn release(&self) -> Result<ReleaseOutcome, SessionError> {
        let intent = lock(&self.drag).release();

        let outcome = match intent {
            None => return Ok(ReleaseOutcome::Nothing),
            Some(DropIntent::Insert(pending)) => {
                match complete_insertion(&self.cache, &self.canvas, pending).await? {
                    InsertionOutcome::Inserted(id) => ReleaseOutcome::Inserted(id),
                    InsertionOutcome::Discarded => return Ok(ReleaseOutcome::Discarded),
                }
            }
            Some(intent @ DropIntent::Move { .. }) => match intent.to_mutation() {
                Some(mutation) => ReleaseOutcome::Moved(self.apply(mutation)?),
                None => return Ok(ReleaseOutcome::Nothing),
            },
        };

        self.edited().await;
        Ok(outcome)
    }

    // ----- block edits -----

    /// Remove a block and everything inside it
    pub async fn delete(&self, block_id: BlockId) -> Result<(), SessionError> {
        self.apply(Mutation::RemoveBlock { block_id })?;
        self.edited().await;
        Ok(())
    }

    /// Copy a block next to itself. Returns the copy's id.
    pub async fn duplicate(&self, block_id: BlockId) -> Result<BlockId, SessionError> {
        let copy = self.apply(Mutation::DuplicateBlock { block_id })?;
        self.edited().await;
        Ok(copy)
    }

    /// Current settings of a block, seeding the state store on first use
    pub fn settings_for(&self, block_id: BlockId) -> Result<Settings, SessionError> {
        let canvas = lock(&self.canvas);
        let block = canvas
            .find(block_id)
            .ok_or(MutationError::BlockNotFound(block_id))?;
        Ok(self.state.get_or_init(block_id, || block.settings.clone()))
    }

    /// Change a single setting and re-render the block
    pub async fn update_setting(
        &self,
        block_id: BlockId,
        key: &str,
        value: &str,
    ) -> Result<Settings, SessionError> {
        self.settings_for(block_id)?;
        let settings = self
            .state
            .update(block_id, key, value)
            .ok_or(MutationError::BlockNotFound(block_id))?;
        self.apply(Mutation::ApplySettings {
            block_id,
            settings: settings.clone(),
        })?;
        self.edited().await;
        Ok(settings)
    }

    /// Replace a block's settings wholesale
    pub async fn apply_settings(&self, block_id: BlockId, settings: Settings) -> Result<(), SessionError> {
        self.apply(Mutation::ApplySettings {
            block_id,
            settings: settings.clone(),
        })?;
        self.state.set(block_id, settings);
        self.edited().await;
        Ok(())
    }

    // ----- history -----

    pub async fn undo(&self) -> bool {
        let moved = self.recorder.undo();
        if moved {
            self.after_restore().await;
        }
        moved
    }

    pub async fn redo(&self) -> bool {
        let moved = self.recorder.redo();
        if moved {
            self.after_restore().await;
        }
        moved
    }

    pub fn can_undo(&self) -> bool {
        self.recorder.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.recorder.can_redo()
    }

    async fn after_restore(&self) {
        // Restored blocks carry their own settings; cached entries are stale
        self.state.rebuild();
        self.edited().await;
    }

    // ----- documents -----

    /// Replace the canvas with the page described by `json`. History
    /// starts over from the loaded page.
    pub async fn load_schema_json(&self, json: &str) -> Result<DeserializeReport, SessionError> {
        let schema = PageSchema::from_json(json)?;
        let report = self
            .deserializer
            .deserialize(&schema, &self.canvas, &self.state)
            .await?;
        self.recorder.reset();
        Ok(report)
    }

    pub fn schema(&self) -> PageSchema {
        serialize(&lock(&self.canvas))
    }

    pub fn schema_json(&self) -> Result<String, SessionError> {
        Ok(self.schema().to_json()?)
    }

    pub fn render_page(&self) -> String {
        render_canvas(&lock(&self.canvas))
    }

    /// Open the page as last saved, then put any newer draft on top of it.
    /// Ids found in the saved markup are never handed out again.
    pub async fn open(&self) -> Result<Option<DraftSource>, SessionError> {
        let Some(autosaver) = &self.autosaver else {
            return Ok(None);
        };
        if let Some(saved) = autosaver.saved_page().await {
            self.load_schema_json(&saved.content.schema_json).await?;
            if let Some(max) = lock(&self.canvas).observe_markup(&saved.content.markup) {
                tracing::debug!(page = %autosaver.page_id(), max_id = max, "adopted saved block ids");
            }
        }
        self.restore_draft().await
    }

    /// Load the newest unsaved draft, if there is one worth restoring
    pub async fn restore_draft(&self) -> Result<Option<DraftSource>, SessionError> {
        let Some(autosaver) = &self.autosaver else {
            return Ok(None);
        };
        let Some((source, draft)) = autosaver.restore().await else {
            return Ok(None);
        };
        self.load_schema_json(&draft.content).await?;
        Ok(Some(source))
    }

    /// Final save right away, skipping the debounce
    pub async fn save_now(&self) -> Result<Option<i64>, SessionError> {
        match &self.autosaver {
            Some(autosaver) => Ok(Some(autosaver.save_now().await?)),
            None => Ok(None),
        }
    }

    fn apply(&self, mutation: Mutation) -> Result<BlockId, SessionError> {
        let result = lock(&self.canvas).apply(mutation)?;
        Ok(result.block_id)
    }

    fn page_content(&self) -> Result<PageContent, SchemaError> {
        let canvas = lock(&self.canvas);
        Ok(PageContent {
            schema_json: serialize(&canvas).to_json()?,
            markup: render_canvas(&canvas),
        })
    }

    async fn edited(&self) {
        let Some(autosaver) = &self.autosaver else {
            return;
        };
        match self.page_content() {
            Ok(page) => autosaver.note_edit(page).await,
            Err(e) => tracing::warn!(error = %e, "could not capture page for autosave"),
        }
    }
}
