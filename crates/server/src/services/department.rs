use serde::Serialize;

use tembea_core::domain::department::{Department, DepartmentSelector, NewDepartment};
use tembea_core::domain::ids::{DepartmentId, HomebaseId};
use tembea_core::errors::ServiceError;
use tembea_core::{EntityStatus, Page, PageRequest, User};

use super::Repositories;

pub const DEPARTMENT_NOT_FOUND: &str =
    "Department not found. To add a new department use POST /api/v1/departments";
const HEAD_NOT_FOUND: &str = "User not found. If your are providing a newHeadEmail, \
     it must be the email of an existing user";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentView {
    #[serde(flatten)]
    pub department: Department,
    pub head: Option<User>,
}

#[derive(Clone)]
pub struct DepartmentService {
    repos: Repositories,
}

impl DepartmentService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Returns the department and whether it counts as newly created.
    ///
    /// An inactive department with a matching name comes back to life under `head`.
    pub async fn create_department(
        &self,
        head: &User,
        name: &str,
        homebase_id: Option<HomebaseId>,
    ) -> Result<(Department, bool), ServiceError> {
        let name = name.trim();
        if let Some(mut existing) = self.repos.departments.find_by_name_prefix(name).await? {
            if existing.status.is_active() {
                return Ok((existing, false));
            }
            existing.status = EntityStatus::Active;
            existing.head_id = Some(head.id);
            if homebase_id.is_some() {
                existing.homebase_id = homebase_id;
            }
            self.repos.departments.update(&existing).await?;
            return Ok((existing, true));
        }

        let department = self
            .repos
            .departments
            .create(NewDepartment { name: name.to_string(), head_id: head.id, homebase_id })
            .await?;
        Ok((department, true))
    }

    pub async fn update_department(
        &self,
        name: &str,
        new_name: Option<&str>,
        new_head_email: Option<&str>,
    ) -> Result<Department, ServiceError> {
        let mut department = self
            .repos
            .departments
            .find_by_name_prefix(name.trim())
            .await?
            .filter(|department| department.status.is_active())
            .ok_or_else(|| ServiceError::not_found(DEPARTMENT_NOT_FOUND))?;

        if let Some(email) = new_head_email.map(str::trim).filter(|email| !email.is_empty()) {
            let head = self
                .repos
                .users
                .find_by_email(email)
                .await?
                .ok_or_else(|| ServiceError::not_found(HEAD_NOT_FOUND))?;
            department.head_id = Some(head.id);
        }
        if let Some(new_name) = new_name.map(str::trim).filter(|new_name| !new_name.is_empty()) {
            department.name = new_name.to_string();
        }

        self.repos.departments.update(&department).await?;
        Ok(department)
    }

    pub async fn get_all_departments(
        &self,
        page: PageRequest,
    ) -> Result<Page<DepartmentView>, ServiceError> {
        let (departments, total) = self.repos.departments.list_active(page).await?;
        let mut views = Vec::with_capacity(departments.len());
        for department in departments {
            let head = match department.head_id {
                Some(id) => self.repos.users.find_by_id(id).await?,
                None => None,
            };
            views.push(DepartmentView { department, head });
        }
        Ok(Page::new(views, page, total))
    }

    pub async fn get_department(&self, id: DepartmentId) -> Result<Department, ServiceError> {
        self.repos
            .departments
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Department not found"))
    }

    /// Soft delete: the department is marked `Inactive`.
    pub async fn delete_department_by_name_or_id(
        &self,
        selector: DepartmentSelector,
    ) -> Result<Department, ServiceError> {
        let found = match &selector {
            DepartmentSelector::Id(id) => self.repos.departments.find_by_id(*id).await?,
            DepartmentSelector::Name(name) => {
                self.repos.departments.find_by_name_prefix(name).await?
            }
        };
        let mut department = found
            .filter(|department| department.status.is_active())
            .ok_or_else(|| ServiceError::not_found("Department not found"))?;

        department.status = EntityStatus::Inactive;
        self.repos.departments.update(&department).await?;
        Ok(department)
    }
}
