//! Folder-tree catalog sync.
//!
//! Mirrors the storage provider's folder hierarchy into the catalog:
//! root-level folders become categories, their children sub-categories,
//! and the files inside those become digital products. Every created
//! entry is a draft; merchants price and publish in the catalog's admin.
//! Per-entry failures land in the summary and never abort siblings.

use paperstack_core::FileId;
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::services::drive::DriveFile;
use crate::state::AppState;

/// What happened to one synced entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Created,
    Skipped,
    Failed,
}

/// Outcome for one category or sub-category entry.
#[derive(Debug, Serialize)]
pub struct EntryOutcome {
    pub name: String,
    pub status: SyncStatus,
}

/// Per-sub-category tally for the product sync.
#[derive(Debug, Serialize)]
pub struct SubCategorySummary {
    pub sub_category: String,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

async fn root_folder(state: &AppState) -> Result<DriveFile, AppError> {
    let name = &state.config().storage.root_folder;
    state
        .storage()
        .find_folder_by_name(name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Root folder '{name}' not found")))
}

/// Mirror root-level folders into catalog categories.
///
/// # Errors
///
/// Returns an error when the root folder listing itself fails; per-entry
/// failures are reported in the outcome list instead.
#[instrument(skip(state))]
pub async fn sync_categories(state: &AppState) -> Result<Vec<EntryOutcome>, AppError> {
    let root = root_folder(state).await?;
    let folders = state.storage().child_folders(&root.id).await?;

    let mut outcomes = Vec::with_capacity(folders.len());
    for folder in folders {
        let folder_id = FileId::from(folder.id.as_str());
        let status = match state.catalog().find_category_by_folder(&folder_id).await {
            Ok(Some(_)) => SyncStatus::Skipped,
            Ok(None) => match state.catalog().create_category(&folder.name, &folder_id).await {
                Ok(_) => SyncStatus::Created,
                Err(e) => {
                    tracing::warn!(error = %e, folder = %folder.name, "Category create failed");
                    SyncStatus::Failed
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, folder = %folder.name, "Category lookup failed");
                SyncStatus::Failed
            }
        };
        outcomes.push(EntryOutcome {
            name: folder.name,
            status,
        });
    }

    state.catalog().invalidate_mirror().await;
    Ok(outcomes)
}

/// Mirror second-level folders into catalog sub-categories.
///
/// Folders whose parent category has not been synced yet are skipped;
/// run the category sync first.
///
/// # Errors
///
/// Returns an error when a folder listing fails outright.
#[instrument(skip(state))]
pub async fn sync_sub_categories(state: &AppState) -> Result<Vec<EntryOutcome>, AppError> {
    let root = root_folder(state).await?;
    let category_folders = state.storage().child_folders(&root.id).await?;

    let mut outcomes = Vec::new();
    for category_folder in category_folders {
        let category_folder_id = FileId::from(category_folder.id.as_str());
        let category = match state
            .catalog()
            .find_category_by_folder(&category_folder_id)
            .await
        {
            Ok(Some(category)) => category,
            Ok(None) => {
                tracing::warn!(
                    folder = %category_folder.name,
                    "No catalog category for folder; run the category sync first"
                );
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, folder = %category_folder.name, "Category lookup failed");
                continue;
            }
        };

        for sub_folder in state.storage().child_folders(&category_folder.id).await? {
            let sub_folder_id = FileId::from(sub_folder.id.as_str());
            let status = match state
                .catalog()
                .find_sub_category_by_folder(&sub_folder_id)
                .await
            {
                Ok(Some(_)) => SyncStatus::Skipped,
                Ok(None) => match state
                    .catalog()
                    .create_sub_category(&sub_folder.name, &sub_folder_id, category.id)
                    .await
                {
                    Ok(_) => SyncStatus::Created,
                    Err(e) => {
                        tracing::warn!(error = %e, folder = %sub_folder.name, "Sub-category create failed");
                        SyncStatus::Failed
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, folder = %sub_folder.name, "Sub-category lookup failed");
                    SyncStatus::Failed
                }
            };
            outcomes.push(EntryOutcome {
                name: sub_folder.name,
                status,
            });
        }
    }

    state.catalog().invalidate_mirror().await;
    Ok(outcomes)
}

/// Mirror files inside synced sub-category folders into draft products.
///
/// # Errors
///
/// Returns an error when a folder listing fails outright.
#[instrument(skip(state))]
pub async fn sync_products(state: &AppState) -> Result<Vec<SubCategorySummary>, AppError> {
    let root = root_folder(state).await?;
    let category_folders = state.storage().child_folders(&root.id).await?;

    let mut summaries = Vec::new();
    for category_folder in category_folders {
        for sub_folder in state.storage().child_folders(&category_folder.id).await? {
            let sub_folder_id = FileId::from(sub_folder.id.as_str());
            let sub_category = match state
                .catalog()
                .find_sub_category_by_folder(&sub_folder_id)
                .await
            {
                Ok(Some(sub_category)) => sub_category,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, folder = %sub_folder.name, "Sub-category lookup failed");
                    continue;
                }
            };

            let mut summary = SubCategorySummary {
                sub_category: sub_folder.name.clone(),
                created: 0,
                skipped: 0,
                failed: 0,
            };

            for file in state.storage().child_files(&sub_folder.id).await? {
                let file_id = FileId::from(file.id.as_str());
                match state.catalog().find_product_by_file(&file_id).await {
                    Ok(Some(_)) => summary.skipped += 1,
                    Ok(None) => match state
                        .catalog()
                        .create_product(&file.name, &file_id, sub_category.id)
                        .await
                    {
                        Ok(_) => summary.created += 1,
                        Err(e) => {
                            tracing::warn!(error = %e, file = %file.name, "Product create failed");
                            summary.failed += 1;
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, file = %file.name, "Product lookup failed");
                        summary.failed += 1;
                    }
                }
            }

            summaries.push(summary);
        }
    }

    state.catalog().invalidate_mirror().await;
    Ok(summaries)
}
