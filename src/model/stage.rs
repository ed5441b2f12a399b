/// Screens the navigator can occupy, in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Stage {
    /// Fixed list of top-level actions.
    #[default]
    MainMenu,
    /// Categories of the chosen catalog.
    CategoryList,
    /// Items of the chosen category, with checkboxes.
    ItemList,
    /// An install session is running.
    Installing,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::MainMenu => "MENU",
            Stage::CategoryList => "CATEGORIES",
            Stage::ItemList => "ITEMS",
            Stage::Installing => "INSTALLING",
        }
    }

    /// One stage backward. `MainMenu` stays put.
    pub fn previous(self) -> Self {
        match self {
            Stage::MainMenu | Stage::CategoryList => Stage::MainMenu,
            Stage::ItemList => Stage::CategoryList,
            Stage::Installing => Stage::ItemList,
        }
    }

    pub fn shows_checkboxes(&self) -> bool {
        matches!(self, Stage::ItemList | Stage::Installing)
    }
}
