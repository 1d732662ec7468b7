use crate::config::FormDefaults;
use crate::payload::{SelectionPayload, DATA_OPTION, ENTIRE_TABLE, SELECTED_VARIABLES, SELECT_VARIABLES};

pub const TABLE: &str = "table_select";
pub const YEAR: &str = "year_select";
pub const ACS_TYPE: &str = "acs_type";
pub const GEOGRAPHY: &str = "geography";
pub const API_KEY: &str = "api_key";

pub const FIRST_YEAR: u16 = 2022;
pub const LAST_YEAR: u16 = 2009;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Text { masked: bool },
    Select { options: Vec<SelectOption> },
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
}

impl Field {
    fn text(name: &'static str, label: &'static str, value: &str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text { masked: false },
            value: value.to_string(),
        }
    }

    fn select(name: &'static str, label: &'static str, options: Vec<SelectOption>) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Select { options },
            value: String::new(),
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self.kind, FieldKind::Select { .. })
    }

    /// Label of the current option for selects, the raw (or masked) text otherwise.
    pub fn display_value(&self) -> String {
        match &self.kind {
            FieldKind::Select { options } => options
                .iter()
                .find(|o| o.value == self.value)
                .map(|o| o.label.clone())
                .unwrap_or_default(),
            FieldKind::Text { masked: true } => "*".repeat(self.value.chars().count()),
            FieldKind::Text { masked: false } => self.value.clone(),
        }
    }

    fn has_option(&self, value: &str) -> bool {
        match &self.kind {
            FieldKind::Select { options } => options.iter().any(|o| o.value == value),
            FieldKind::Text { .. } => true,
        }
    }
}

/// Appends one option per year, newest first. Value and label are the same string.
pub fn populate_years(options: &mut Vec<SelectOption>) {
    for year in (LAST_YEAR..=FIRST_YEAR).rev() {
        let year = year.to_string();
        options.push(SelectOption::new(&year, &year));
    }
}

pub fn variable_panel_visible(data_option: &str) -> bool {
    data_option == SELECT_VARIABLES
}

/// In-memory data-selection form: field values, focus and panel visibility.
#[derive(Debug, Clone)]
pub struct FormState {
    fields: Vec<Field>,
    focused: usize,
    variable_panel_visible: bool,
}

impl FormState {
    pub fn new(defaults: &FormDefaults) -> Self {
        let mut years = Field::select(YEAR, "Year", Vec::new());
        if let FieldKind::Select { options } = &mut years.kind {
            populate_years(options);
        }

        let mut api_key = Field::text(API_KEY, "Census API key", &defaults.api_key);
        api_key.kind = FieldKind::Text { masked: true };

        let fields = vec![
            Field::text(TABLE, "Table", &defaults.table),
            years,
            Field::select(
                ACS_TYPE,
                "Survey",
                vec![
                    SelectOption::new("acs1", "1-year"),
                    SelectOption::new("acs5", "5-year"),
                ],
            ),
            Field::select(
                DATA_OPTION,
                "Data",
                vec![
                    SelectOption::new(ENTIRE_TABLE, "Entire table"),
                    SelectOption::new(SELECT_VARIABLES, "Select variables"),
                ],
            ),
            Field::text(SELECTED_VARIABLES, "Variables", &defaults.selected_variables),
            Field::text(GEOGRAPHY, "Geography", &defaults.geography),
            api_key,
        ];

        let mut form = Self {
            fields,
            focused: 0,
            variable_panel_visible: false,
        };

        for field in form.fields.iter_mut() {
            if let FieldKind::Select { options } = &field.kind {
                if let Some(first) = options.first() {
                    field.value = first.value.clone();
                }
            }
        }
        if let Some(year) = &defaults.year {
            form.set_value(YEAR, year);
        }
        form.set_value(ACS_TYPE, &defaults.acs_type);
        form.set_value(DATA_OPTION, &defaults.data_option);
        form.on_data_option_changed();
        form
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value.as_str())
    }

    pub fn focused_field(&self) -> Option<&Field> {
        self.fields.get(self.focused)
    }

    pub fn variable_panel_visible(&self) -> bool {
        self.variable_panel_visible
    }

    pub fn is_visible(&self, field: &Field) -> bool {
        field.name != SELECTED_VARIABLES || self.variable_panel_visible
    }

    /// Sets a field value. Select fields only accept one of their options.
    pub fn set_value(&mut self, name: &str, value: &str) -> bool {
        let Some(field) = self.fields.iter_mut().find(|f| f.name == name) else {
            return false;
        };
        if !field.has_option(value) {
            return false;
        }
        field.value = value.to_string();
        if name == DATA_OPTION {
            self.on_data_option_changed();
        }
        true
    }

    pub fn focus_next(&mut self) {
        self.move_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.move_focus(self.fields.len() - 1);
    }

    fn move_focus(&mut self, step: usize) {
        let len = self.fields.len();
        let mut next = self.focused;
        for _ in 0..len {
            next = (next + step) % len;
            if self.is_visible(&self.fields[next]) {
                self.focused = next;
                return;
            }
        }
    }

    /// Steps the focused select to its next (or previous) option, wrapping around.
    pub fn cycle_option(&mut self, forward: bool) {
        let Some(field) = self.fields.get_mut(self.focused) else {
            return;
        };
        let FieldKind::Select { options } = &field.kind else {
            return;
        };
        if options.is_empty() {
            return;
        }
        let current = options
            .iter()
            .position(|o| o.value == field.value)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % options.len()
        } else {
            (current + options.len() - 1) % options.len()
        };
        field.value = options[next].value.clone();

        if field.name == DATA_OPTION {
            self.on_data_option_changed();
        }
    }

    pub fn input_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focused) {
            if !field.is_select() && !c.is_control() {
                field.value.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focused) {
            if !field.is_select() {
                field.value.pop();
            }
        }
    }

    /// All named fields in form order, hidden ones included.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|f| (f.name, f.value.as_str()))
    }

    pub fn to_payload(&self) -> SelectionPayload {
        SelectionPayload::from_entries(self.entries())
    }

    fn on_data_option_changed(&mut self) {
        let data_option = self.value(DATA_OPTION).unwrap_or_default();
        self.variable_panel_visible = variable_panel_visible(data_option);

        if !self.is_visible(&self.fields[self.focused]) {
            self.focus_next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> FormState {
        FormState::new(&FormDefaults::default())
    }

    fn focus(form: &mut FormState, name: &str) {
        while form.focused_field().map(|f| f.name) != Some(name) {
            form.focus_next();
        }
    }

    #[test]
    fn years_descend_from_2022_to_2009() {
        let form = form();
        let Some(FieldKind::Select { options }) = form.field(YEAR).map(|f| &f.kind) else {
            panic!("year field should be a select");
        };

        let expected: Vec<String> = (2009..=2022).rev().map(|y: u16| y.to_string()).collect();
        let values: Vec<String> = options.iter().map(|o| o.value.clone()).collect();
        assert_eq!(values, expected);
        assert!(options.iter().all(|o| o.value == o.label));
        assert_eq!(form.value(YEAR), Some("2022"));
    }

    #[test]
    fn populate_years_appends_to_existing_options() {
        let mut options = vec![SelectOption::new("", "Choose a year")];
        populate_years(&mut options);
        assert_eq!(options.len(), 15);
        assert_eq!(options[1].value, "2022");
        assert_eq!(options[14].value, "2009");
    }

    #[test]
    fn panel_visible_only_for_select_variables() {
        assert!(variable_panel_visible("select_variables"));
        assert!(!variable_panel_visible("entire_table"));
        assert!(!variable_panel_visible(""));
        assert!(!variable_panel_visible("Select_Variables"));
    }

    #[test]
    fn changing_data_option_toggles_panel() {
        let mut form = form();
        assert!(!form.variable_panel_visible());

        assert!(form.set_value(DATA_OPTION, SELECT_VARIABLES));
        assert!(form.variable_panel_visible());

        // Idempotent
        assert!(form.set_value(DATA_OPTION, SELECT_VARIABLES));
        assert!(form.variable_panel_visible());

        assert!(form.set_value(DATA_OPTION, ENTIRE_TABLE));
        assert!(!form.variable_panel_visible());
    }

    #[test]
    fn cycling_data_option_toggles_panel() {
        let mut form = form();
        focus(&mut form, DATA_OPTION);

        form.cycle_option(true);
        assert_eq!(form.value(DATA_OPTION), Some(SELECT_VARIABLES));
        assert!(form.variable_panel_visible());

        form.cycle_option(true);
        assert_eq!(form.value(DATA_OPTION), Some(ENTIRE_TABLE));
        assert!(!form.variable_panel_visible());
    }

    #[test]
    fn focus_skips_hidden_variables_field() {
        let mut form = form();
        focus(&mut form, DATA_OPTION);
        form.focus_next();
        assert_eq!(form.focused_field().map(|f| f.name), Some(GEOGRAPHY));

        form.set_value(DATA_OPTION, SELECT_VARIABLES);
        focus(&mut form, DATA_OPTION);
        form.focus_next();
        assert_eq!(
            form.focused_field().map(|f| f.name),
            Some(SELECTED_VARIABLES)
        );
    }

    #[test]
    fn select_rejects_unknown_values() {
        let mut form = form();
        assert!(!form.set_value(YEAR, "1999"));
        assert_eq!(form.value(YEAR), Some("2022"));
        assert!(form.set_value(YEAR, "2015"));
        assert_eq!(form.value(YEAR), Some("2015"));
    }

    #[test]
    fn typing_edits_text_fields_only() {
        let mut form = form();
        focus(&mut form, TABLE);
        form.backspace();
        form.backspace();
        form.input_char('0');
        form.input_char('2');
        assert_eq!(form.value(TABLE), Some("DP02"));

        focus(&mut form, YEAR);
        form.input_char('9');
        form.backspace();
        assert_eq!(form.value(YEAR), Some("2022"));
    }

    #[test]
    fn hidden_variables_stripped_from_payload_for_entire_table() {
        let mut form = form();
        form.set_value(SELECTED_VARIABLES, "DP05_0001E");

        let payload = form.to_payload();
        assert!(!payload.contains_key(SELECTED_VARIABLES));
        assert_eq!(payload.get(TABLE), Some("DP05"));
        assert_eq!(payload.get(API_KEY), Some(""));
    }

    #[test]
    fn payload_carries_variables_when_selecting() {
        let mut form = form();
        form.set_value(DATA_OPTION, SELECT_VARIABLES);
        form.set_value(SELECTED_VARIABLES, "DP05_0001E,DP05_0002E");

        let payload = form.to_payload();
        assert_eq!(
            payload.get(SELECTED_VARIABLES),
            Some("DP05_0001E,DP05_0002E")
        );
        assert_eq!(payload.len(), form.fields().len());
    }

    #[test]
    fn api_key_is_masked_on_display() {
        let mut form = form();
        form.set_value(API_KEY, "abc123");
        assert_eq!(form.field(API_KEY).unwrap().display_value(), "******");
        assert_eq!(form.value(API_KEY), Some("abc123"));
    }

    #[test]
    fn configured_defaults_are_applied() {
        let defaults = FormDefaults {
            year: Some("2012".to_string()),
            acs_type: "acs1".to_string(),
            data_option: SELECT_VARIABLES.to_string(),
            ..FormDefaults::default()
        };
        let form = FormState::new(&defaults);
        assert_eq!(form.value(YEAR), Some("2012"));
        assert_eq!(form.value(ACS_TYPE), Some("acs1"));
        assert!(form.variable_panel_visible());
    }
}
