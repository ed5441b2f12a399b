use crate::model::catalog::{CatalogProvider, Category};
use crate::model::config::CatalogsConfig;
use crate::model::installer::{InstallKind, InstallOutcome};
use crate::model::menu::{CatalogId, MAIN_MENU, MenuTarget};
use crate::model::selection::SelectionSet;
use crate::model::session::{InstallSession, Job, ProgressEvent, SessionResult, StepResult};
use crate::model::stage::Stage;
use crate::msg::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenCatalog {
    id: CatalogId,
    kind: InstallKind,
}

/// One line of the visible list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub name: String,
    pub is_cursor: bool,
    /// `Some` only where the list has checkboxes.
    pub selected: Option<bool>,
}

/// Everything the view needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub stage: Stage,
    pub rows: Vec<Row>,
    pub progress: Option<ProgressEvent>,
    pub installing: Option<String>,
    pub breadcrumb: String,
    pub description: Option<&'static str>,
    pub error: Option<String>,
    pub help_visible: bool,
}

/// Stage machine behind the menu: MainMenu → CategoryList → ItemList →
/// Installing → back to where the session started.
pub struct Navigator<P: CatalogProvider> {
    provider: P,
    catalogs: CatalogsConfig,
    stage: Stage,
    cursor: usize,
    open_catalog: Option<OpenCatalog>,
    categories: Vec<Category>,
    category: Option<usize>,
    items: Vec<String>,
    selection: SelectionSet,
    session: Option<InstallSession>,
    return_stage: Stage,
    last_result: Option<SessionResult>,
    failed_total: usize,
    help_visible: bool,
    error: Option<String>,
    should_quit: bool,
}

impl<P: CatalogProvider> Navigator<P> {
    pub fn new(provider: P, catalogs: CatalogsConfig) -> Self {
        Self {
            provider,
            catalogs,
            stage: Stage::MainMenu,
            cursor: 0,
            open_catalog: None,
            categories: Vec::new(),
            category: None,
            items: Vec::new(),
            selection: SelectionSet::default(),
            session: None,
            return_stage: Stage::MainMenu,
            last_result: None,
            failed_total: 0,
            help_visible: false,
            error: None,
            should_quit: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn session(&self) -> Option<&InstallSession> {
        self.session.as_ref()
    }

    pub fn last_result(&self) -> Option<SessionResult> {
        self.last_result
    }

    /// Failed items across every session run so far.
    pub fn failed_total(&self) -> usize {
        self.failed_total
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Up => self.on_up(),
            Action::Down => self.on_down(),
            Action::Enter => self.on_enter(),
            Action::Back => self.on_back(),
            Action::Install => self.on_install(),
            Action::Help => self.help_visible = !self.help_visible,
            Action::Quit => self.on_quit(),
        }
        self.clamp_cursor();
    }

    fn list_len(&self) -> usize {
        match self.stage {
            Stage::MainMenu => MAIN_MENU.len(),
            Stage::CategoryList => self.categories.len(),
            Stage::ItemList => self.items.len(),
            Stage::Installing => 0,
        }
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.list_len().saturating_sub(1));
    }

    fn enter_stage(&mut self, stage: Stage) {
        tracing::info!("stage {} -> {}", self.stage.label(), stage.label());
        self.stage = stage;
        self.cursor = 0;
    }

    pub fn on_up(&mut self) {
        if self.stage == Stage::Installing {
            return;
        }
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn on_down(&mut self) {
        if self.stage == Stage::Installing {
            return;
        }
        if self.cursor + 1 < self.list_len() {
            self.cursor += 1;
        }
    }

    pub fn on_enter(&mut self) {
        match self.stage {
            Stage::MainMenu => self.choose_menu_action(),
            Stage::CategoryList => self.open_category(),
            Stage::ItemList => {
                if self.cursor < self.items.len() {
                    self.selection.toggle(self.cursor);
                }
            }
            Stage::Installing => {}
        }
    }

    fn choose_menu_action(&mut self) {
        let Some(action) = MAIN_MENU.get(self.cursor) else {
            return;
        };

        match action.target {
            MenuTarget::Script(name) => {
                self.begin_session(vec![name.to_string()], InstallKind::Script);
            }
            MenuTarget::Catalog { id, kind } => {
                let key = id.key(&self.catalogs).to_string();
                match self.provider.list_categories(&key) {
                    Ok(categories) => {
                        tracing::info!("opened catalog {key} ({} categories)", categories.len());
                        self.open_catalog = Some(OpenCatalog { id, kind });
                        self.categories = categories;
                        self.category = None;
                        self.error = None;
                        self.enter_stage(Stage::CategoryList);
                    }
                    Err(err) => {
                        tracing::warn!("{err}");
                        self.error = Some(err.to_string());
                    }
                }
            }
        }
    }

    fn open_category(&mut self) {
        let Some(category) = self.categories.get(self.cursor) else {
            return;
        };

        let (items, selection) = SelectionSet::initialize(&category.entries);
        tracing::info!(
            "opened category {} ({} items, {} preselected)",
            category.name,
            items.len(),
            selection.len()
        );
        self.items = items;
        self.selection = selection;
        self.category = Some(self.cursor);
        self.enter_stage(Stage::ItemList);
    }

    pub fn on_install(&mut self) {
        if self.stage != Stage::ItemList {
            return;
        }
        if self.selection.is_empty() {
            tracing::debug!("install requested with nothing selected");
            return;
        }
        let frozen = self.selection.materialize(&self.items);
        let kind = self
            .open_catalog
            .map(|catalog| catalog.kind)
            .unwrap_or(InstallKind::Package);
        self.begin_session(frozen, kind);
    }

    fn begin_session(&mut self, items: Vec<String>, kind: InstallKind) {
        match InstallSession::start(items, kind) {
            Ok(session) => {
                tracing::info!("installing {} {}(s)", session.total(), kind.noun());
                self.return_stage = self.stage;
                self.session = Some(session);
                self.error = None;
                self.enter_stage(Stage::Installing);
            }
            Err(err) => {
                tracing::warn!("{err}");
                self.error = Some(err.to_string());
            }
        }
    }

    pub fn on_back(&mut self) {
        // Sessions cannot be cancelled once started.
        if self.stage == Stage::Installing {
            return;
        }

        match self.stage {
            Stage::ItemList => {
                self.items.clear();
                self.category = None;
            }
            Stage::CategoryList => {
                self.categories.clear();
                self.open_catalog = None;
            }
            _ => {}
        }
        self.selection.clear();
        self.error = None;
        let previous = self.stage.previous();
        self.enter_stage(previous);
    }

    pub fn on_quit(&mut self) {
        if self.session.is_some() {
            tracing::warn!("quitting with an install session in progress");
        }
        self.should_quit = true;
    }

    /// Next job to hand to a worker, if a session is waiting for one.
    pub fn next_job(&mut self) -> Option<Job> {
        self.session.as_mut()?.dispatch()
    }

    /// Records a worker's outcome. When the session finishes, the
    /// navigator returns to the stage the session was started from.
    pub fn on_outcome(&mut self, outcome: InstallOutcome) -> Option<StepResult> {
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("install outcome for {} without a session", outcome.item_name);
            return None;
        };

        let step = session.record(outcome)?;
        if let StepResult::Finished { result, .. } = &step {
            tracing::info!("{}", result.summary());
            self.failed_total += result.failure_count;
            self.last_result = Some(*result);
            self.session = None;
            let back_to = self.return_stage;
            self.enter_stage(back_to);
        }
        Some(step)
    }

    pub fn snapshot(&self) -> Snapshot {
        let cursor = self.cursor.min(self.list_len().saturating_sub(1));
        let names: Vec<&str> = match self.stage {
            Stage::MainMenu => MAIN_MENU.iter().map(|a| a.title).collect(),
            Stage::CategoryList => self.categories.iter().map(|c| c.name.as_str()).collect(),
            Stage::ItemList | Stage::Installing => {
                if self.return_stage == Stage::MainMenu && self.stage == Stage::Installing {
                    MAIN_MENU.iter().map(|a| a.title).collect()
                } else {
                    self.items.iter().map(String::as_str).collect()
                }
            }
        };

        let checkboxes = self.stage.shows_checkboxes() && self.return_stage_is_items();
        let rows = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| Row {
                name: name.to_string(),
                is_cursor: self.stage != Stage::Installing && idx == cursor,
                selected: checkboxes.then(|| self.selection.contains(idx)),
            })
            .collect();

        let description = match self.stage {
            Stage::MainMenu => MAIN_MENU.get(cursor).map(|a| a.description),
            _ => None,
        };

        Snapshot {
            stage: self.stage,
            rows,
            progress: self.session.as_ref().and_then(|s| s.last_progress().cloned()),
            installing: self
                .session
                .as_ref()
                .and_then(|s| s.current_job())
                .map(|job| job.item_name),
            breadcrumb: self.breadcrumb(),
            description,
            error: self.error.clone(),
            help_visible: self.help_visible,
        }
    }

    fn return_stage_is_items(&self) -> bool {
        self.stage == Stage::ItemList || self.return_stage == Stage::ItemList
    }

    fn breadcrumb(&self) -> String {
        let mut parts = Vec::new();
        if let Some(catalog) = self.open_catalog {
            parts.push(catalog.id.key(&self.catalogs).to_string());
        }
        if let Some(category) = self.category.and_then(|idx| self.categories.get(idx)) {
            parts.push(category.name.clone());
        }
        parts.join(" › ")
    }
}

#[cfg(test)]
impl<P: CatalogProvider> Navigator<P> {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::model::session::tests::ScriptedInstaller;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeCatalog {
        catalogs: HashMap<String, Vec<Category>>,
    }

    impl FakeCatalog {
        fn with_packages() -> Self {
            let mut catalogs = HashMap::new();
            catalogs.insert(
                "packages".to_string(),
                vec![
                    Category {
                        name: "Editors".to_string(),
                        key: "editors".to_string(),
                        entries: vec!["#vim".into(), "emacs".into(), "nano".into()],
                    },
                    Category {
                        name: "Shell".to_string(),
                        key: "shell".to_string(),
                        entries: vec!["zsh".into(), "fish".into()],
                    },
                ],
            );
            Self { catalogs }
        }
    }

    impl CatalogProvider for FakeCatalog {
        fn list_categories(&self, catalog_key: &str) -> Result<Vec<Category>> {
            self.catalogs
                .get(catalog_key)
                .cloned()
                .ok_or_else(|| Error::catalog_read(catalog_key, "missing"))
        }
    }

    fn catalogs() -> CatalogsConfig {
        CatalogsConfig {
            packages: "packages".to_string(),
            extensions: "vscode".to_string(),
        }
    }

    fn navigator() -> Navigator<FakeCatalog> {
        Navigator::new(FakeCatalog::with_packages(), catalogs())
    }

    fn menu_index(pred: impl Fn(&MenuTarget) -> bool) -> usize {
        MAIN_MENU.iter().position(|a| pred(&a.target)).unwrap()
    }

    fn move_to(nav: &mut Navigator<FakeCatalog>, index: usize) {
        for _ in 0..index {
            nav.apply(Action::Down);
        }
    }

    /// MainMenu → packages → "Editors".
    fn at_editors() -> Navigator<FakeCatalog> {
        let mut nav = navigator();
        let packages = menu_index(|t| {
            matches!(t, MenuTarget::Catalog { id: CatalogId::Packages, .. })
        });
        move_to(&mut nav, packages);
        nav.apply(Action::Enter);
        assert_eq!(nav.stage(), Stage::CategoryList);
        nav.apply(Action::Enter);
        assert_eq!(nav.stage(), Stage::ItemList);
        nav
    }

    fn drain(nav: &mut Navigator<FakeCatalog>, installer: &ScriptedInstaller) -> Vec<StepResult> {
        use crate::model::installer::Installer;
        let mut steps = Vec::new();
        while let Some(job) = nav.next_job() {
            let outcome = installer.install(&job.item_name, job.kind);
            steps.extend(nav.on_outcome(outcome));
        }
        steps
    }

    #[test]
    fn cursor_clamps_at_both_ends() {
        let mut nav = navigator();
        nav.apply(Action::Up);
        assert_eq!(nav.cursor(), 0);
        for _ in 0..MAIN_MENU.len() + 3 {
            nav.apply(Action::Down);
        }
        assert_eq!(nav.cursor(), MAIN_MENU.len() - 1);
    }

    #[test]
    fn entering_a_category_initializes_selection() {
        let nav = at_editors();
        assert_eq!(nav.items(), ["vim", "emacs", "nano"]);
        assert!(!nav.selection().contains(0));
        assert!(nav.selection().contains(1));
        assert!(nav.selection().contains(2));
        assert_eq!(nav.cursor(), 0);
    }

    #[test]
    fn enter_on_item_toggles_without_changing_stage() {
        let mut nav = at_editors();
        nav.apply(Action::Enter);
        assert_eq!(nav.stage(), Stage::ItemList);
        assert_eq!(
            nav.selection().materialize(nav.items()),
            vec!["vim", "emacs", "nano"]
        );
    }

    #[test]
    fn back_from_items_resets_cursor_and_selection() {
        let mut nav = at_editors();
        nav.apply(Action::Down);
        nav.apply(Action::Down);
        nav.apply(Action::Back);
        assert_eq!(nav.stage(), Stage::CategoryList);
        assert_eq!(nav.cursor(), 0);
        assert!(nav.selection().is_empty());
        assert!(nav.items().is_empty());
    }

    #[test]
    fn back_from_main_menu_is_a_no_op() {
        let mut nav = navigator();
        nav.apply(Action::Down);
        nav.apply(Action::Back);
        assert_eq!(nav.stage(), Stage::MainMenu);
        assert_eq!(nav.cursor(), 0);
    }

    #[test]
    fn switching_category_discards_old_selection() {
        let mut nav = at_editors();
        nav.apply(Action::Back);
        nav.apply(Action::Down);
        nav.apply(Action::Enter);
        assert_eq!(nav.items(), ["zsh", "fish"]);
        assert_eq!(nav.selection().len(), 2);
        assert_eq!(nav.selection().materialize(nav.items()), vec!["zsh", "fish"]);
    }

    #[test]
    fn install_with_empty_selection_is_a_no_op() {
        let mut nav = at_editors();
        nav.apply(Action::Down);
        nav.apply(Action::Enter);
        nav.apply(Action::Down);
        nav.apply(Action::Enter);
        assert!(nav.selection().is_empty());

        nav.apply(Action::Install);
        assert_eq!(nav.stage(), Stage::ItemList);
        assert_eq!(nav.cursor(), 2);
        assert!(nav.session().is_none());
        assert!(nav.next_job().is_none());
    }

    #[test]
    fn install_outside_item_list_is_ignored() {
        let mut nav = navigator();
        nav.apply(Action::Install);
        assert_eq!(nav.stage(), Stage::MainMenu);
        assert!(nav.session().is_none());
    }

    #[test]
    fn session_runs_in_order_and_returns_to_item_list() {
        let mut nav = at_editors();
        nav.apply(Action::Enter); // select vim too
        nav.apply(Action::Install);
        assert_eq!(nav.stage(), Stage::Installing);
        assert_eq!(nav.session().unwrap().items(), ["vim", "emacs", "nano"]);

        let installer = ScriptedInstaller::failing(&["emacs"]);
        let steps = drain(&mut nav, &installer);

        assert_eq!(
            *installer.calls.lock().unwrap(),
            vec!["vim".to_string(), "emacs".to_string(), "nano".to_string()]
        );
        assert_eq!(steps.len(), 3);
        assert!(matches!(steps[2], StepResult::Finished { .. }));
        assert_eq!(nav.stage(), Stage::ItemList);
        assert_eq!(nav.cursor(), 0);
        assert!(nav.session().is_none());
        assert_eq!(nav.failed_total(), 1);
        assert_eq!(
            nav.last_result().unwrap().summary(),
            "Done! 2 installed, 1 failed."
        );
        // Selection survives the session untouched.
        assert_eq!(nav.selection().len(), 3);
    }

    #[test]
    fn selection_changes_after_start_do_not_leak_into_the_session() {
        let mut nav = at_editors();
        nav.apply(Action::Install);
        let frozen = nav.session().unwrap().items().to_vec();
        // Navigation input is ignored while installing.
        nav.apply(Action::Enter);
        nav.apply(Action::Back);
        nav.apply(Action::Down);
        assert_eq!(nav.stage(), Stage::Installing);
        assert_eq!(nav.session().unwrap().items(), frozen.as_slice());
    }

    #[test]
    fn only_one_job_is_dispatched_at_a_time() {
        let mut nav = at_editors();
        nav.apply(Action::Install);
        let first = nav.next_job().unwrap();
        assert_eq!(first.item_name, "emacs");
        assert_eq!(first.kind, InstallKind::Package);
        assert!(nav.next_job().is_none());

        nav.on_outcome(InstallOutcome::success("emacs", "ok"));
        assert_eq!(nav.next_job().unwrap().item_name, "nano");
    }

    #[test]
    fn script_action_runs_single_item_session_and_returns_to_menu() {
        let mut nav = navigator();
        let paru = menu_index(|t| matches!(t, MenuTarget::Script(_)));
        move_to(&mut nav, paru);
        nav.apply(Action::Enter);
        assert_eq!(nav.stage(), Stage::Installing);

        let job = nav.next_job().unwrap();
        assert_eq!(job.kind, InstallKind::Script);
        let step = nav
            .on_outcome(InstallOutcome::success(job.item_name.clone(), "done"))
            .unwrap();
        assert!(matches!(step, StepResult::Finished { .. }));
        assert_eq!(nav.stage(), Stage::MainMenu);
        assert_eq!(nav.cursor(), 0);
    }

    #[test]
    fn catalog_read_error_keeps_the_main_menu() {
        let mut nav = Navigator::new(FakeCatalog::default(), catalogs());
        nav.apply(Action::Enter);
        assert_eq!(nav.stage(), Stage::MainMenu);
        let snapshot = nav.snapshot();
        assert!(snapshot.error.unwrap().contains("packages"));
    }

    #[test]
    fn quit_is_available_while_installing() {
        let mut nav = at_editors();
        nav.apply(Action::Install);
        nav.apply(Action::Quit);
        assert!(nav.should_quit());
    }

    #[test]
    fn snapshot_reflects_cursor_and_checkboxes() {
        let mut nav = at_editors();
        nav.apply(Action::Down);
        nav.apply(Action::Help);
        let snapshot = nav.snapshot();
        assert_eq!(snapshot.stage, Stage::ItemList);
        assert!(snapshot.help_visible);
        assert_eq!(snapshot.breadcrumb, "packages › Editors");
        let cursor_rows: Vec<usize> = snapshot
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_cursor)
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(cursor_rows, vec![1]);
        let checks: Vec<Option<bool>> = snapshot.rows.iter().map(|r| r.selected).collect();
        assert_eq!(checks, vec![Some(false), Some(true), Some(true)]);
    }

    #[test]
    fn snapshot_at_main_menu_has_description_and_no_checkboxes() {
        let snapshot = navigator().snapshot();
        assert_eq!(snapshot.rows.len(), MAIN_MENU.len());
        assert_eq!(snapshot.description, Some(MAIN_MENU[0].description));
        assert!(snapshot.rows.iter().all(|r| r.selected.is_none()));
    }

    #[test]
    fn progress_is_exposed_while_installing() {
        let mut nav = at_editors();
        nav.apply(Action::Install);
        let job = nav.next_job().unwrap();
        nav.on_outcome(InstallOutcome::failure(job.item_name, "boom"));

        let snapshot = nav.snapshot();
        let progress = snapshot.progress.unwrap();
        assert_eq!(progress.completed_count, 1);
        assert_eq!(progress.fraction(), 0.0);
        assert_eq!(snapshot.installing.as_deref(), Some("nano"));
    }
}
