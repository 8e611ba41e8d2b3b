use diesel::prelude::*;
use lombok::AllArgsConstructor;

#[derive(Insertable, AllArgsConstructor, Debug)]
#[diesel(table_name = crate::database::schema::follows)]
pub struct NewFollow {
    pub user_id: i32,
    pub author_id: i32,
}
