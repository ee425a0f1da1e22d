//! Integration tests for tuple, struct and variant binding.

use chrono::NaiveDate;
use fbclient_rs::engine::memory::{Cell, FieldSpec, MemoryEngine, ScriptedQuery};
use fbclient_rs::{
    sql_struct, sql_variant, Attachment, AttachmentOptions, Client, Cursor, Error, ScaledInt32,
    ScaledInt64, SqlType, Statement, StatementOptions, Transaction, TransactionOptions,
};

sql_struct! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Employee {
        pub id: i64,
        pub name: String,
        pub salary: Option<ScaledInt64>,
        pub hired: Option<NaiveDate>,
    }
}

sql_struct! {
    #[derive(Debug, PartialEq)]
    struct Single {
        value: i32,
    }
}

sql_variant! {
    #[derive(Debug, PartialEq)]
    pub enum Amount {
        Missing,
        Small(ScaledInt32),
        Big(ScaledInt64),
        Text(String),
    }
}

sql_variant! {
    #[derive(Debug, PartialEq)]
    enum Required {
        Whole(i64),
        Text(String),
    }
}

const EMPLOYEE_SQL: &str = "select cast(? as bigint) id, cast(? as varchar(20)) name, \
     cast(? as numeric(18,2)) salary, cast(? as date) hired from rdb$database";

fn with_statement(
    client: &Client,
    uri: &str,
    sql: &str,
    check: impl FnOnce(&mut Statement<'_>, &Transaction<'_>),
) {
    let options = AttachmentOptions::new().with_create_database(true);
    let attachment = Attachment::connect(client, uri, &options).unwrap();
    let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
    let mut statement =
        Statement::prepare(&attachment, &transaction, sql, &StatementOptions::new()).unwrap();
    check(&mut statement, &transaction);
}

#[test]
fn test_struct_round_trip() {
    with_statement(&Client::memory(), "mem:struct", EMPLOYEE_SQL, |statement, transaction| {
        let employee = Employee {
            id: 17,
            name: "Ada".to_string(),
            salary: Some(ScaledInt64::new(1_250_050, -2)),
            hired: NaiveDate::from_ymd_opt(2021, 3, 1),
        };
        statement.set_params(employee.clone()).unwrap();
        assert!(statement.execute(transaction).unwrap());
        assert_eq!(statement.row::<Employee>().unwrap(), employee);
        assert_eq!(statement.get_string(2).unwrap().as_deref(), Some("12500.50"));

        let partial = Employee {
            salary: None,
            hired: None,
            ..employee
        };
        statement.set_params(&partial).unwrap();
        statement.execute(transaction).unwrap();
        assert_eq!(statement.row::<Employee>().unwrap(), partial);
    });
}

#[test]
fn test_tuple_round_trip() {
    with_statement(&Client::memory(), "mem:tuple", EMPLOYEE_SQL, |statement, transaction| {
        statement
            .set_params((5i64, "Grace", None::<ScaledInt64>, NaiveDate::from_ymd_opt(1990, 12, 9)))
            .unwrap();
        statement.execute(transaction).unwrap();

        let (id, name, salary, hired): (i64, String, Option<f64>, Option<String>) =
            statement.row().unwrap();
        assert_eq!(id, 5);
        assert_eq!(name, "Grace");
        assert_eq!(salary, None);
        assert_eq!(hired.as_deref(), Some("1990-12-09"));
    });
}

#[test]
fn test_count_mismatch_both_directions() {
    with_statement(
        &Client::memory(),
        "mem:mismatch",
        "select cast(? as integer), cast(? as integer) from rdb$database",
        |statement, transaction| {
            let err = statement.set_params((1,)).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Tuple element count (1) does not match input parameter count (2)"
            );
            let err = statement.set_params(Single { value: 1 }).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Struct field count (1) does not match input parameter count (2)"
            );

            statement.set_params((1, 2)).unwrap();
            statement.execute(transaction).unwrap();
            let err = statement.row::<(i32, i32, i32)>().unwrap_err();
            assert_eq!(
                err.to_string(),
                "Tuple element count (3) does not match output column count (2)"
            );
            assert!(matches!(
                statement.row::<Single>(),
                Err(Error::CountMismatch { actual: 1, expected: 2, .. })
            ));
            assert!(matches!(
                statement.query::<(i32,)>(transaction),
                Err(Error::CountMismatch { .. })
            ));
        },
    );
}

#[test]
fn test_null_in_required_field() {
    with_statement(
        &Client::memory(),
        "mem:required",
        "select cast(? as integer), cast(? as varchar(5)) from rdb$database",
        |statement, transaction| {
            statement.set_params((1, None::<&str>)).unwrap();
            statement.execute(transaction).unwrap();

            let err = statement.row::<(i32, String)>().unwrap_err();
            assert!(matches!(err, Error::NullValue { index: 1 }));
            assert_eq!(
                err.to_string(),
                "Null value encountered for non-optional field at index 1"
            );
            assert_eq!(
                statement.row::<(i32, Option<String>)>().unwrap(),
                (1, None)
            );
        },
    );
}

#[test]
fn test_single_value_access() {
    with_statement(
        &Client::memory(),
        "mem:single",
        "select cast(? as smallint), cast(? as double precision) from rdb$database",
        |statement, transaction| {
            statement.set(0, 12i16).unwrap();
            statement.set(1, None::<f64>).unwrap();
            statement.execute(transaction).unwrap();
            assert_eq!(statement.get::<i16>(0).unwrap(), 12);
            assert_eq!(statement.get::<Option<i64>>(0).unwrap(), Some(12));
            assert_eq!(statement.get::<Option<f64>>(1).unwrap(), None);
            assert!(matches!(statement.get::<f64>(1), Err(Error::NullValue { index: 1 })));
        },
    );
}

#[test]
fn test_variant_columns() {
    with_statement(
        &Client::memory(),
        "mem:variants",
        "select cast(? as numeric(18,4)), cast(? as integer), cast(? as varchar(8)), \
         cast(? as integer) from rdb$database",
        |statement, transaction| {
            statement.set_string(0, "3.1416").unwrap();
            statement.set_int32(1, 5).unwrap();
            statement.set_string(2, "n/a").unwrap();
            statement.set_null(3).unwrap();
            statement.execute(transaction).unwrap();

            assert_eq!(
                statement.get_variant::<Amount>(0).unwrap(),
                Amount::Big(ScaledInt64::new(31416, -4))
            );
            assert_eq!(
                statement.get_variant::<Amount>(1).unwrap(),
                Amount::Small(ScaledInt32::new(5, 0))
            );
            assert_eq!(
                statement.get_variant::<Amount>(2).unwrap(),
                Amount::Text("n/a".to_string())
            );
            assert_eq!(statement.get_variant::<Amount>(3).unwrap(), Amount::Missing);

            assert_eq!(statement.get_variant::<Required>(1).unwrap(), Required::Whole(5));
            assert!(matches!(
                statement.get_variant::<Required>(3),
                Err(Error::Usage { .. })
            ));
        },
    );
}

#[test]
fn test_variants_in_rows_and_params() {
    with_statement(
        &Client::memory(),
        "mem:variant-row",
        "select cast(? as numeric(9,2)), cast(? as varchar(10)) from rdb$database",
        |statement, transaction| {
            statement
                .set_params((Amount::Small(ScaledInt32::new(150, -1)), Amount::Missing))
                .unwrap();
            statement.execute(transaction).unwrap();
            let (amount, text): (Amount, Amount) = statement.row().unwrap();
            assert_eq!(amount, Amount::Small(ScaledInt32::new(1500, -2)));
            assert_eq!(text, Amount::Missing);
        },
    );
}

#[test]
fn test_query_structs_from_result_set() {
    let sql = "select id, name, salary, hired from employee order by id";
    let engine = MemoryEngine::new();
    engine.register_query(
        sql,
        ScriptedQuery::new()
            .with_column(FieldSpec::new(SqlType::Int64).with_alias("ID"))
            .with_column(FieldSpec::new(SqlType::Varying).with_length(20).with_alias("NAME"))
            .with_column(FieldSpec::new(SqlType::Int64).with_scale(-2).with_alias("SALARY"))
            .with_column(FieldSpec::new(SqlType::Date).with_alias("HIRED"))
            .with_row(vec![
                Cell::Integer(1),
                Cell::Text("Ada".into()),
                Cell::Integer(10_000),
                Cell::Null,
            ])
            .with_row(vec![
                Cell::Integer(2),
                Cell::Text("Grace".into()),
                Cell::Null,
                Cell::Null,
            ]),
    );

    with_statement(&Client::new(engine), "mem:query", sql, |statement, transaction| {
        let mut cursor = statement.query::<Employee>(transaction).unwrap();
        let employees = cursor.fetch_all().unwrap();
        assert_eq!(cursor.rowcount(), 2);
        assert_eq!(
            employees,
            vec![
                Employee {
                    id: 1,
                    name: "Ada".to_string(),
                    salary: Some(ScaledInt64::new(10_000, -2)),
                    hired: None,
                },
                Employee {
                    id: 2,
                    name: "Grace".to_string(),
                    salary: None,
                    hired: None,
                },
            ]
        );
    });
}
