use anyhow::Result;
use std::collections::BTreeMap;

use crate::filter;
use crate::models::{
    ApplicationStatus, FilterCriteria, JobRecord, RecordStore, SortKey, SortState, StatusMap,
};
use crate::paginate::Pagination;
use crate::salary::{parse_salary, SalaryRange};
use crate::sort;
use crate::store::{BatchOutcome, StatusStore, Storage};
use crate::view_state::ViewState;

/// Typed user actions. Renderers translate their input events into these.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFilter(FilterCriteria),
    ClearFilters,
    /// Same column flips direction, a new column sorts ascending.
    ToggleSort(SortKey),
    SetSort(SortState),
    SetPage(usize),
    NextPage,
    PreviousPage,
    SetPerPage(usize),
    SetStatus { id: String, status: ApplicationStatus },
    ClearStatus { id: String },
    ApplyBatch(BTreeMap<String, ApplicationStatus>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Updated,
    Batch(BatchOutcome),
}

#[derive(Debug, Clone)]
pub struct Row<'a> {
    pub record: &'a JobRecord,
    pub status: Option<ApplicationStatus>,
    pub salary: Option<SalaryRange>,
}

/// Everything a renderer needs for one page.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub rows: Vec<Row<'a>>,
    pub total: usize,
    pub current_page: usize,
    /// At least 1, even for an empty result.
    pub total_pages: usize,
}

/// Engine state over an immutable record store.
pub struct Session<'a, S: Storage> {
    records: &'a [JobRecord],
    statuses: StatusStore<S>,
    criteria: FilterCriteria,
    sort: SortState,
    pagination: Pagination,
    filtered: Vec<&'a JobRecord>,
    ordered: Vec<&'a JobRecord>,
}

impl<'a, S: Storage> Session<'a, S> {
    pub fn new(store: &'a RecordStore, statuses: StatusStore<S>, per_page: usize) -> Self {
        let records = store.records();
        let all: Vec<&JobRecord> = records.iter().collect();
        let mut pagination = Pagination::default();
        pagination.set_per_page(per_page);
        Self {
            records,
            statuses,
            criteria: FilterCriteria::default(),
            sort: SortState::default(),
            pagination,
            ordered: all.clone(),
            filtered: all,
        }
    }

    /// Applies a shared view state. A filter pass only runs when either the old or the
    /// new state carries filters.
    pub fn restore(&mut self, view: &ViewState) {
        let was_filtered = self.criteria.is_active();
        self.criteria = view.criteria.clone();
        if was_filtered || view.has_filters() {
            self.refilter();
        }
        self.pagination.set_page(view.page);
        self.pagination.clamp(self.ordered.len());
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        tracing::debug!(?command, "dispatch");
        match command {
            Command::SetFilter(criteria) => {
                self.criteria = criteria;
                self.pagination.set_page(1);
                self.refilter();
            }
            Command::ClearFilters => {
                self.criteria = FilterCriteria::default();
                self.pagination.set_page(1);
                self.refilter();
            }
            Command::ToggleSort(key) => {
                self.sort.toggle(key);
                self.resort();
            }
            Command::SetSort(state) => {
                self.sort = state;
                self.resort();
            }
            Command::SetPage(page) => {
                self.pagination.set_page(page);
                self.pagination.clamp(self.ordered.len());
            }
            Command::NextPage => self.pagination.next_page(self.ordered.len()),
            Command::PreviousPage => self.pagination.previous_page(),
            Command::SetPerPage(per_page) => {
                self.pagination.set_per_page(per_page);
                self.pagination.clamp(self.ordered.len());
            }
            Command::SetStatus { id, status } => {
                self.statuses.set_status(&id, status)?;
                self.after_status_change();
            }
            Command::ClearStatus { id } => {
                self.statuses.clear_status(&id)?;
                self.after_status_change();
            }
            Command::ApplyBatch(pending) => {
                let outcome = self.statuses.apply_batch(&pending)?;
                if outcome != BatchOutcome::NothingSelected {
                    self.after_status_change();
                }
                return Ok(Outcome::Batch(outcome));
            }
        }
        Ok(Outcome::Updated)
    }

    pub fn view(&self) -> PageView<'a> {
        let statuses = self.statuses.get_all();
        let mut pagination = self.pagination;
        let rows = pagination
            .slice(&self.ordered)
            .iter()
            .map(|&record| Row {
                record,
                status: filter::resolve_status(record, &statuses),
                salary: parse_salary(record.salary.as_deref()),
            })
            .collect();

        PageView {
            rows,
            total: self.ordered.len(),
            current_page: pagination.current_page(),
            total_pages: pagination.display_pages(self.ordered.len()),
        }
    }

    pub fn view_state(&self) -> ViewState {
        ViewState::new(self.criteria.clone(), self.pagination.current_page())
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn statuses(&self) -> StatusMap {
        self.statuses.get_all()
    }

    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    pub fn filtered_count(&self) -> usize {
        self.ordered.len()
    }

    fn refilter(&mut self) {
        let statuses = self.statuses.get_all();
        self.filtered = filter::apply(self.records, &statuses, &self.criteria);
        self.resort();
    }

    fn resort(&mut self) {
        self.ordered = sort::sorted(&self.filtered, &self.sort);
        self.pagination.clamp(self.ordered.len());
    }

    fn after_status_change(&mut self) {
        // Only status-dependent criteria can change membership.
        if self.criteria.depends_on_status() {
            self.refilter();
        }
    }
}
