use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogMode {
    #[default]
    Create,
    Edit,
    View,
}

/// Visibility of the store's create/edit/view dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogState<Id> {
    pub visible: bool,
    pub selected_id: Option<Id>,
    pub mode: DialogMode,
}

impl<Id> Default for DialogState<Id> {
    fn default() -> Self {
        Self {
            visible: false,
            selected_id: None,
            mode: DialogMode::Create,
        }
    }
}

impl<Id> DialogState<Id> {
    /// Shows the dialog. Without an explicit mode, an id means `Edit` and no id means `Create`.
    pub fn open(&mut self, selected_id: Option<Id>, mode: Option<DialogMode>) {
        self.mode = mode.unwrap_or(if selected_id.is_some() {
            DialogMode::Edit
        } else {
            DialogMode::Create
        });
        self.selected_id = selected_id;
        self.visible = true;
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_defaults_mode_from_id() {
        let mut dialog = DialogState::default();
        dialog.open(Some(4), None);
        assert!(dialog.visible);
        assert_eq!(dialog.mode, DialogMode::Edit);
        assert_eq!(dialog.selected_id, Some(4));

        dialog.open(None, None);
        assert_eq!(dialog.mode, DialogMode::Create);
        assert_eq!(dialog.selected_id, None);

        dialog.open(Some(2), Some(DialogMode::View));
        assert_eq!(dialog.mode, DialogMode::View);
    }

    #[test]
    fn test_close_resets() {
        let mut dialog = DialogState::default();
        dialog.open(Some(9), Some(DialogMode::View));
        dialog.close();
        assert_eq!(dialog, DialogState::default());
    }
}
