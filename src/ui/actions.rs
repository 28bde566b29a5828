//! Named UI interactions
//!
//! Each helper performs exactly one interaction with the driver. When its
//! target cannot be found it fails with `ElementNotFound`; nothing here
//! retries or waits.

use crate::common::{Error, Result};

use super::controls::{Control, ControlMap};
use super::driver::{ElementHandle, UiDriver};
use super::locator::Locator;

/// Action helpers bound to a driver and a control map
pub struct UiActions<'a> {
    driver: &'a dyn UiDriver,
    controls: &'a ControlMap,
}

impl<'a> UiActions<'a> {
    pub fn new(driver: &'a dyn UiDriver, controls: &'a ControlMap) -> Self {
        Self { driver, controls }
    }

    /// First element matching the locator
    async fn locate(&self, action: &str, locator: &Locator) -> Result<ElementHandle> {
        let found = self.driver.find_elements(locator).await?;
        found
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(action, locator))
    }

    async fn click_control(&self, action: &str, control: Control) -> Result<()> {
        let locator = self.controls.locator(control);
        let element = self.locate(action, &locator).await?;
        tracing::debug!(action, locator = %locator, "Click");
        self.driver.click(&element).await
    }

    async fn click_item(&self, action: &str, control: Control, label: &str) -> Result<()> {
        let locator = self.controls.item_locator(control, label);
        let element = self.locate(action, &locator).await?;
        tracing::debug!(action, locator = %locator, "Click");
        self.driver.click(&element).await
    }

    /// Checked state of a checkbox. Toolkit checkboxes are plain elements
    /// that carry `aria-checked`; native inputs expose the `checked`
    /// property instead.
    async fn is_checked(&self, action: &str, locator: &Locator, element: &ElementHandle) -> Result<bool> {
        if let Some(state) = self.driver.attribute(element, "aria-checked").await? {
            return Ok(state == "true");
        }
        match self.driver.property(element, "checked").await? {
            Some(state) => Ok(state == "true"),
            None => Err(Error::CheckStateUnknown {
                action: action.to_string(),
                locator: locator.to_string(),
            }),
        }
    }

    /// Bring a checkbox to the requested state, clicking only on a difference
    async fn set_checkbox(&self, action: &str, control: Control, wanted: bool) -> Result<()> {
        let locator = self.controls.locator(control);
        let element = self.locate(action, &locator).await?;
        if self.is_checked(action, &locator, &element).await? != wanted {
            tracing::debug!(action, wanted, "Toggle");
            self.driver.click(&element).await?;
        }
        Ok(())
    }

    pub async fn click_session_menu(&self) -> Result<()> {
        self.click_control("open session menu", Control::SessionMenu)
            .await
    }

    pub async fn click_session_save(&self) -> Result<()> {
        self.click_control("open save dialog", Control::SessionSave)
            .await
    }

    /// Choose what the snapshot captures
    pub async fn set_save_options(&self, preferences: bool, layout: bool, data: bool) -> Result<()> {
        self.set_checkbox("save preferences option", Control::SavePreferences, preferences)
            .await?;
        self.set_checkbox("save layout option", Control::SaveLayout, layout)
            .await?;
        self.set_checkbox("save data option", Control::SaveData, data)
            .await
    }

    /// Replace the snapshot name field's contents
    pub async fn set_save_name(&self, name: &str) -> Result<()> {
        let locator = self.controls.locator(Control::SaveName);
        let element = self.locate("set snapshot name", &locator).await?;
        self.driver.clear(&element).await?;
        self.driver.send_keys(&element, name).await
    }

    pub async fn save_snapshot(&self) -> Result<()> {
        self.click_control("confirm save", Control::SaveConfirm)
            .await
    }

    pub async fn close_save(&self) -> Result<()> {
        self.click_control("close save dialog", Control::SaveClose)
            .await
    }

    pub async fn click_session_restore(&self) -> Result<()> {
        self.click_control("open restore dialog", Control::SessionRestore)
            .await
    }

    /// Pick a snapshot by name in the restore selector
    pub async fn select_restore_snapshot(&self, name: &str) -> Result<()> {
        self.click_control("open snapshot selector", Control::RestoreSelector)
            .await?;
        self.click_item("select snapshot", Control::SnapshotItem, name)
            .await
    }

    pub async fn restore_snapshot(&self) -> Result<()> {
        self.click_control("confirm restore", Control::RestoreConfirm)
            .await
    }

    pub async fn close_restore(&self) -> Result<()> {
        self.click_control("close restore dialog", Control::RestoreClose)
            .await
    }

    /// Switch the workspace to a named layout through the layout menu
    pub async fn switch_layout(&self, layout: &str) -> Result<()> {
        self.click_control("open layout menu", Control::LayoutMenu)
            .await?;
        self.click_item("choose layout", Control::LayoutItem, layout)
            .await
    }

    /// Number of display windows in the workspace
    pub async fn count_windows(&self) -> Result<usize> {
        let locator = self.controls.locator(Control::DisplayWindow);
        let windows = self.driver.find_elements(&locator).await?;
        Ok(windows.len())
    }
}
