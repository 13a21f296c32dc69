use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(254)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsStaff)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsSuperuser)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::DateJoined).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Decisions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Decisions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Decisions::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Decisions::Description).text().not_null())
                    .col(ColumnDef::new(Decisions::MeasurableGoal).text().not_null())
                    .col(
                        ColumnDef::new(Decisions::Status)
                            .string_len(20)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(Decisions::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Decisions::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Evaluations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Evaluations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Evaluations::DecisionId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Evaluations::GoalMet).boolean().not_null())
                    .col(
                        ColumnDef::new(Evaluations::Comments)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Evaluations::EvaluatedAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_evaluations_decision_id")
                            .from(Evaluations::Table, Evaluations::DecisionId)
                            .to(Decisions::Table, Decisions::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_decisions_title")
                    .table(Decisions::Table)
                    .col(Decisions::Title)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Evaluations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Decisions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    IsStaff,
    IsSuperuser,
    IsActive,
    DateJoined,
}

#[derive(DeriveIden)]
enum Decisions {
    Table,
    Id,
    Title,
    Description,
    MeasurableGoal,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Evaluations {
    Table,
    Id,
    DecisionId,
    GoalMet,
    Comments,
    EvaluatedAt,
}
