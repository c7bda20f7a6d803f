//! Message components: buttons, select menus, views and modals

mod button;
mod modal;
mod select;
mod view;

pub use button::{Button, ButtonStyle};
pub use modal::{Modal, TextInput, TextInputStyle, MAX_INPUTS};
pub use select::{SelectKind, SelectMenu, SelectOption, MAX_SELECT_VALUES};
pub use view::{ActionRow, View, MAX_BUTTONS_PER_ROW, MAX_ROWS, MAX_VIEW_TIMEOUT};
