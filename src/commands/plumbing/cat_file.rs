use crate::areas::repository::Repository;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;

impl Repository {
    /// Pretty-print one object: trees as a listing, everything else verbatim
    pub fn cat_file(&self, object_sha: &str) -> anyhow::Result<()> {
        let object_id = ObjectId::try_parse(object_sha.to_string())?;
        let (object_type, payload) = self.database().read_object(&object_id)?;

        match object_type {
            ObjectType::Tree => {
                let tree = Tree::deserialize(payload)?;
                if !tree.entries().is_empty() {
                    writeln!(self.writer(), "{}", tree.display())?;
                }
            }
            _ => self.writer().write_all(&payload)?,
        }

        Ok(())
    }
}
