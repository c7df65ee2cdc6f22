use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len(Users::Username, 150).unique_key())
                    .col(string_len(Users::Password, 128).default(""))
                    .col(string_len(Users::Email, 254).default(""))
                    .col(string_len(Users::FirstName, 150).default(""))
                    .col(string_len(Users::LastName, 150).default(""))
                    .col(timestamp_with_time_zone_null(Users::LastLogin))
                    .col(boolean(Users::IsSuperuser).default(false))
                    .col(boolean(Users::IsStaff).default(false))
                    .col(boolean(Users::IsActive).default(true))
                    .col(timestamp_with_time_zone(Users::DateJoined).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Users::UpdatedAt).default(Expr::current_timestamp()))
                    .col(string_len(Users::UserType, 10).default("buyer"))
                    .col(string_len(Users::PhoneNumber, 15).default(""))
                    .col(boolean(Users::IsVerified).default(false))
                    .col(string_len(Users::LicenseNumber, 50).default(""))
                    .col(string_len(Users::AgencyName, 100).default(""))
                    .col(
                        integer(Users::YearsExperience)
                            .default(0)
                            .check(Expr::col(Users::YearsExperience).gte(0)),
                    )
                    .col(text(Users::Bio).default(""))
                    .col(string_len_null(Users::ProfilePicture, 100))
                    .to_owned(),
            )
            .await?;

        // Agent approval queue: unverified agents
        manager
            .create_index(
                Index::create()
                    .name("idx_users_user_type_is_verified")
                    .table(Users::Table)
                    .col(Users::UserType)
                    .col(Users::IsVerified)
                    .to_owned(),
            )
            .await?;

        // Chronological admin listing
        manager
            .create_index(
                Index::create()
                    .name("idx_users_date_joined")
                    .table(Users::Table)
                    .col(Users::DateJoined)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
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
    Password,
    Email,
    FirstName,
    LastName,
    LastLogin,
    IsSuperuser,
    IsStaff,
    IsActive,
    DateJoined,
    UpdatedAt,
    UserType,
    PhoneNumber,
    IsVerified,
    LicenseNumber,
    AgencyName,
    YearsExperience,
    Bio,
    ProfilePicture,
}
