//! Authorization predicate shared by every operation.
//!
//! Operations load the facts they need (the association's admin list, the
//! document's uploader, the donation's donor) into a [`Target`] and ask
//! [`require`] whether the [`Principal`] may perform an [`Action`] on it.
//! A global admin may perform every action.

use crate::entities::Role;
use crate::errors::{Error, Result};
use serde::Serialize;
use uuid::Uuid;

/// Authenticated actor, decoded from a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// User id
    pub id: Uuid,
    /// Email at the time the token was minted
    pub email: String,
    /// Role at the time the token was minted
    pub role: Role,
}

impl Principal {
    /// Whether the actor is a platform administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Guarded operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Edit association fields
    UpdateAssociation,
    /// Delete an association and its campaigns
    DeleteAssociation,
    /// Work inside an association: campaigns, documents, dashboard, admin list
    ManageAssociation,
    /// Read a document
    ReadDocument,
    /// Edit, change the status of, or delete a document
    ModifyDocument,
    /// Read a donation
    ReadDonation,
    /// Issue the tax receipt of a donation
    IssueReceipt,
    /// Refund a completed donation
    RefundDonation,
    /// List users and change roles
    ManageUsers,
}

/// Facts about the object an action applies to
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// An association, with its admin list
    Association {
        /// Members of the association's admin list
        admins: &'a [Uuid],
    },
    /// A document, with the admin list of its association
    Document {
        /// Members of the owning association's admin list
        admins: &'a [Uuid],
        /// Uploader of the document
        uploaded_by: Uuid,
        /// Whether the document is public
        is_public: bool,
    },
    /// A donation
    Donation {
        /// Donor of the donation
        donor_id: Uuid,
    },
    /// Platform-wide resources with no owner
    Platform,
}

/// Decides whether `actor` may perform `action` on `target`.
#[must_use]
pub fn can_act(actor: &Principal, action: Action, target: Target<'_>) -> bool {
    if actor.is_admin() {
        return true;
    }

    match (action, target) {
        (
            Action::UpdateAssociation | Action::DeleteAssociation | Action::ManageAssociation,
            Target::Association { admins },
        ) => admins.contains(&actor.id),
        (
            Action::ReadDocument,
            Target::Document {
                admins,
                uploaded_by,
                is_public,
            },
        ) => is_public || uploaded_by == actor.id || admins.contains(&actor.id),
        (
            Action::ModifyDocument,
            Target::Document {
                admins,
                uploaded_by,
                ..
            },
        ) => uploaded_by == actor.id || admins.contains(&actor.id),
        (Action::ReadDonation | Action::IssueReceipt, Target::Donation { donor_id }) => {
            donor_id == actor.id
        }
        _ => false,
    }
}

/// Like [`can_act`], failing with [`Error::Forbidden`].
pub fn require(actor: &Principal, action: Action, target: Target<'_>) -> Result<()> {
    if can_act(actor, action, target) {
        Ok(())
    } else {
        Err(Error::forbidden(format!("not allowed to {}", describe(action))))
    }
}

const fn describe(action: Action) -> &'static str {
    match action {
        Action::UpdateAssociation => "update this association",
        Action::DeleteAssociation => "delete this association",
        Action::ManageAssociation => "manage this association",
        Action::ReadDocument => "read this document",
        Action::ModifyDocument => "modify this document",
        Action::ReadDonation => "read this donation",
        Action::IssueReceipt => "issue a receipt for this donation",
        Action::RefundDonation => "refund donations",
        Action::ManageUsers => "manage users",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "someone@example.org".to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_override() {
        let admin = principal(Role::Admin);
        let stranger = Uuid::new_v4();
        let targets = [
            Target::Association { admins: &[] },
            Target::Document {
                admins: &[],
                uploaded_by: stranger,
                is_public: false,
            },
            Target::Donation { donor_id: stranger },
            Target::Platform,
        ];
        for target in targets {
            assert!(can_act(&admin, Action::ManageUsers, target));
            assert!(can_act(&admin, Action::DeleteAssociation, target));
        }
    }

    #[test]
    fn test_association_membership() {
        let member = principal(Role::Donor);
        let outsider = principal(Role::Donor);
        let admins = [member.id];
        let target = Target::Association { admins: &admins };

        assert!(can_act(&member, Action::UpdateAssociation, target));
        assert!(can_act(&member, Action::ManageAssociation, target));
        assert!(!can_act(&outsider, Action::UpdateAssociation, target));
        assert!(matches!(
            require(&outsider, Action::DeleteAssociation, target),
            Err(Error::Forbidden { .. })
        ));
    }

    #[test]
    fn test_private_document_visibility() {
        let uploader = principal(Role::Donor);
        let association_admin = principal(Role::Donor);
        let other = principal(Role::Donor);
        let admins = [association_admin.id];
        let private = Target::Document {
            admins: &admins,
            uploaded_by: uploader.id,
            is_public: false,
        };

        assert!(can_act(&uploader, Action::ReadDocument, private));
        assert!(can_act(&association_admin, Action::ReadDocument, private));
        assert!(!can_act(&other, Action::ReadDocument, private));
        assert!(!can_act(&other, Action::ModifyDocument, private));

        let public = Target::Document {
            admins: &admins,
            uploaded_by: uploader.id,
            is_public: true,
        };
        assert!(can_act(&other, Action::ReadDocument, public));
        assert!(!can_act(&other, Action::ModifyDocument, public));
    }

    #[test]
    fn test_donation_belongs_to_donor() {
        let donor = principal(Role::Donor);
        let other = principal(Role::Donor);
        let target = Target::Donation { donor_id: donor.id };

        assert!(can_act(&donor, Action::ReadDonation, target));
        assert!(can_act(&donor, Action::IssueReceipt, target));
        assert!(!can_act(&donor, Action::RefundDonation, target));
        assert!(!can_act(&other, Action::ReadDonation, target));
    }

    #[test]
    fn test_platform_actions_need_admin() {
        let donor = principal(Role::Donor);
        assert!(!can_act(&donor, Action::ManageUsers, Target::Platform));
        assert!(!can_act(&donor, Action::RefundDonation, Target::Platform));
    }
}
